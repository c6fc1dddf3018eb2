use crate::{
    AppState,
    db::UserExt,
    dtos::{
        FilterUserDto, LoginUserDto, RegisterUserDto, ResolveUsernameDto,
        ResolveUsernameResponseDto, Response, SendVerificationCodeDto, UserLoginResponseDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::send_verification_code_email,
    middleware::{JWTAuthMiddleware, auth},
    utils::{membership, password, token},
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use rand::Rng;
use validator::Validate;

use tracing::instrument;

/// Verification codes stay valid this long.
const CODE_TTL_MINUTES: i64 = 10;

pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/send_code", post(send_code))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/resolve_username", post(resolve_username))
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Issue a fresh verification code and email it. The answer does not vary
/// by whether the address is already registered, so the endpoint does not
/// leak which addresses exist.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn send_code(
    State(app_state): State<AppState>,
    Json(body): Json<SendVerificationCodeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid send_code input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
    let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

    app_state
        .db_client
        .save_verification_code(&body.email, &code, expires_at)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving verification code: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // The code row is already committed, so a retry after a mail outage
    // can reuse it.
    send_verification_code_email(&body.email, &code, CODE_TTL_MINUTES)
        .await
        .map_err(|e| {
            tracing::error!("Failed to send verification code email: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(Response {
        status: "success",
        message: "Verification code sent. Please check your email.".to_string(),
    }))
}

/// Register a new account. The initial role comes from the membership code
/// digest (or the configured admin email), defaulting to plain user.
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let taken = app_state
        .db_client
        .username_or_email_exists(&body.username, &body.email)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking duplicates: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if taken {
        return Err(HttpError::conflict(
            ErrorMessage::UsernameOrEmailTaken.to_string(),
        ));
    }

    let code = app_state
        .db_client
        .find_valid_verification_code(&body.email, &body.verification_code)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking verification code: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::error!("Verification code rejected");
            HttpError::bad_request(ErrorMessage::VerificationCodeInvalid.to_string())
        })?;

    let role = membership::assign_role(
        &app_state.env,
        &body.email,
        body.membership_code_digest.as_deref(),
    );

    let hash_password = password::hash(&body.password_digest).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .register_user(
            &body.username,
            &body.nickname,
            &body.email,
            &hash_password,
            role,
            code.id,
        )
        .await;

    match result {
        Ok(user) => {
            tracing::info!(username = %user.username, role = %user.role.to_str(), "Register Successful");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message: "Registration successful! You can log in now.".to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // Lost the race against a concurrent registration
            tracing::error!("DB error, saving user, unique_violation: {}", db_err);
            Err(HttpError::conflict(
                ErrorMessage::UsernameOrEmailTaken.to_string(),
            ))
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Login by username or email. Every failure answers the same way so
/// callers cannot tell a missing user from a bad password.
#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user_by_identifier(&body.identifier)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::error!("User not found");
            HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
        })?;

    let password_matched =
        password::compare(&body.password_digest, &user.password_hash).map_err(|e| {
            tracing::error!("Password error: {}", e);
            HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
        })?;

    if !password_matched {
        tracing::error!("password mismatch");
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    let access_token = token::create_token(
        user.id,
        &user.username,
        user.role,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage * 60,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let cookie_maxage = time::Duration::minutes(app_state.env.jwt_maxage);

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .max_age(cookie_maxage)
        .http_only(true)
        .build();

    // Display cookies for the frontend; readable from JS on purpose. The
    // nickname may hold non-ASCII, so it travels percent-encoded.
    let nickname_cookie = Cookie::build((
        "nickname",
        urlencoding::encode(&user.nickname).into_owned(),
    ))
    .path("/")
    .max_age(cookie_maxage)
    .build();

    let role_cookie = Cookie::build(("user_role", user.role.to_str().to_string()))
        .path("/")
        .max_age(cookie_maxage)
        .build();

    let mut headers = HeaderMap::new();
    for cookie in [&access_cookie, &nickname_cookie, &role_cookie] {
        headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());
    }

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token,
        nickname: user.nickname,
    })
    .into_response();
    response.headers_mut().extend(headers);

    tracing::info!(user_id = %user.id, "Login Successful");
    Ok(response)
}

/// Clear the session cookies. The token itself stays valid until it expires;
/// there is no server-side session to revoke.
#[instrument]
pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let mut headers = HeaderMap::new();
    for name in ["access_token", "nickname", "user_role"] {
        let cookie = Cookie::build((name, ""))
            .path("/")
            .max_age(time::Duration::seconds(0))
            .build();
        headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());
    }

    let mut response = Json(Response {
        status: "success",
        message: "Logged out.".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

/// Look up the username behind an identifier so the client can build its
/// prefixed credential digest before login.
#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn resolve_username(
    State(app_state): State<AppState>,
    Json(body): Json<ResolveUsernameDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid resolve_username input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user_by_identifier(&body.identifier)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    Ok(Json(ResolveUsernameResponseDto {
        status: "success".to_string(),
        username: user.username,
    }))
}

/// Current authenticated user.
#[instrument(skip_all, fields(user_id = %auth_user.user.id))]
pub async fn me(
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&auth_user.user),
    }))
}
