//! JWT 认证模块
//!
//! 身份解析器：校验连接携带的 bearer 凭证并得到稳定的用户 id。
//! 凭证无效或过期的连接在注册到会话注册表之前就被拒绝。

use axum::http::HeaderMap;
use config::JwtConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            user_id,
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::unauthorized(format!("Token generation failed: {}", err)))
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| ApiError::unauthorized(format!("Invalid token: {}", err)))
    }

    /// 从 Authorization 头提取并验证 token
    pub fn extract_user_from_headers(&self, headers: &HeaderMap) -> Result<Uuid, ApiError> {
        let auth_header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))?;

        let claims = self.verify_token(token)?;
        Ok(claims.user_id)
    }

    /// 连接建立时的凭证：优先查询参数，其次 bearer 头
    pub fn extract_user(
        &self,
        query_token: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Uuid, ApiError> {
        match query_token {
            Some(token) if !token.is_empty() => {
                let claims = self.verify_token(token)?;
                Ok(claims.user_id)
            }
            _ => self.extract_user_from_headers(headers),
        }
    }
}
