use sqlx::{Pool, Postgres};

pub mod user;
pub use user::UserExt;

pub mod article;
pub use article::ArticleExt;

pub mod comment;
pub use comment::CommentExt;

pub mod card;
pub use card::CardExt;

pub mod review;
pub use review::ReviewExt;

pub mod achievement;
pub use achievement::AchievementExt;

pub mod homepage;
pub use homepage::HomepageExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
