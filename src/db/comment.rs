use std::collections::HashMap;

use super::DBClient;
use crate::dtos::CommentDto;
use crate::models::Comment;

const COMMENT_COLUMNS: &str =
    "id, article_id, user_id, parent_id, content, is_pinned, pinned_at, created_at";

/// Breadth-first levels of the subtree rooted at `root`, root level first.
/// `edges` holds `(id, parent_id)` for every comment in the thread; rows
/// outside the subtree are ignored.
fn subtree_levels(root: i32, edges: &[(i32, Option<i32>)]) -> Vec<Vec<i32>> {
    let mut children_of: HashMap<i32, Vec<i32>> = HashMap::new();
    for (id, parent_id) in edges {
        if let Some(parent_id) = parent_id {
            children_of.entry(*parent_id).or_default().push(*id);
        }
    }

    let mut levels: Vec<Vec<i32>> = Vec::new();
    let mut frontier = vec![root];
    while !frontier.is_empty() {
        let next = frontier
            .iter()
            .flat_map(|id| children_of.get(id).cloned().unwrap_or_default())
            .collect();
        levels.push(frontier);
        frontier = next;
    }

    levels
}

/// Comment database operations.
pub trait CommentExt {
    /// Insert a comment and return it with the author's nickname.
    async fn save_comment(
        &self,
        article_id: i32,
        user_id: i32,
        parent_id: Option<i32>,
        content: &str,
    ) -> Result<CommentDto, sqlx::Error>;

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error>;

    /// Full comment list for an article: pinned first (most recently pinned
    /// on top), then the rest oldest-first so threads read chronologically.
    async fn get_comments(&self, article_id: i32) -> Result<Vec<CommentDto>, sqlx::Error>;

    /// Delete a comment and every descendant, children before parents.
    /// Returns the number of rows removed.
    async fn delete_comment_subtree(&self, comment_id: i32) -> Result<u64, sqlx::Error>;

    /// Pin or unpin a top-level comment.
    async fn set_comment_pin(&self, comment_id: i32, pinned: bool)
    -> Result<Comment, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn save_comment(
        &self,
        article_id: i32,
        user_id: i32,
        parent_id: Option<i32>,
        content: &str,
    ) -> Result<CommentDto, sqlx::Error> {
        let comment = sqlx::query_as::<_, CommentDto>(
            "WITH inserted AS ( \
                 INSERT INTO comments (article_id, user_id, parent_id, content) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, article_id, user_id, parent_id, content, is_pinned, created_at \
             ) \
             SELECT i.id, i.article_id, i.user_id, u.nickname AS user_nickname, \
                    i.parent_id, i.content, i.is_pinned, i.created_at \
             FROM inserted i JOIN users u ON u.id = i.user_id",
        )
        .bind(article_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn get_comments(&self, article_id: i32) -> Result<Vec<CommentDto>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentDto>(
            "SELECT c.id, c.article_id, c.user_id, u.nickname AS user_nickname, \
                    c.parent_id, c.content, c.is_pinned, c.created_at \
             FROM comments c JOIN users u ON u.id = c.user_id \
             WHERE c.article_id = $1 \
             ORDER BY c.is_pinned DESC, c.pinned_at DESC NULLS LAST, c.created_at ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn delete_comment_subtree(&self, comment_id: i32) -> Result<u64, sqlx::Error> {
        // One fetch for the whole article thread, then the level walk runs
        // in memory and the deletes go deepest level first so no child ever
        // outlives its parent mid-transaction.
        let edges = sqlx::query_as::<_, (i32, Option<i32>)>(
            "SELECT id, parent_id FROM comments \
             WHERE article_id = (SELECT article_id FROM comments WHERE id = $1)",
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;

        let levels = subtree_levels(comment_id, &edges);

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;

        for ids in levels.iter().rev() {
            let result = sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
                .bind(ids)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(deleted)
    }

    async fn set_comment_pin(
        &self,
        comment_id: i32,
        pinned: bool,
    ) -> Result<Comment, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET \
             is_pinned = $2, \
             pinned_at = CASE WHEN $2 THEN Now() ELSE NULL END \
             WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment_id)
        .bind(pinned)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 is the root; 2 and 3 reply to it; 4 and 5 reply to 2; 6 replies
    // to 4. 10 starts an unrelated thread on the same article.
    fn thread() -> Vec<(i32, Option<i32>)> {
        vec![
            (1, None),
            (2, Some(1)),
            (3, Some(1)),
            (4, Some(2)),
            (5, Some(2)),
            (6, Some(4)),
            (10, None),
            (11, Some(10)),
        ]
    }

    #[test]
    fn subtree_covers_every_descendant_and_nothing_else() {
        let levels = subtree_levels(1, &thread());

        let all: Vec<i32> = levels.iter().flatten().copied().collect();
        assert_eq!(all.len(), 6);
        for id in [1, 2, 3, 4, 5, 6] {
            assert!(all.contains(&id));
        }
        assert!(!all.contains(&10));
        assert!(!all.contains(&11));
    }

    #[test]
    fn every_parent_sits_in_an_earlier_level_than_its_children() {
        let edges = thread();
        let levels = subtree_levels(1, &edges);

        let level_of = |id: i32| levels.iter().position(|l| l.contains(&id));
        for (id, parent_id) in &edges {
            let Some(parent_id) = parent_id else { continue };
            if let (Some(child), Some(parent)) = (level_of(*id), level_of(*parent_id)) {
                assert!(parent < child);
            }
        }
    }

    #[test]
    fn a_leaf_deletes_only_itself() {
        let levels = subtree_levels(6, &thread());
        assert_eq!(levels, vec![vec![6]]);
    }

    #[test]
    fn a_mid_tree_comment_takes_its_branch_only() {
        let levels = subtree_levels(2, &thread());
        assert_eq!(levels, vec![vec![2], vec![4, 5], vec![6]]);
    }
}
