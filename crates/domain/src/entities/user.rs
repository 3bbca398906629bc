use uuid::Uuid;

/// 用户展示信息
///
/// 由用户目录（外部协作方）提供，仅用于装饰消息与会话摘要。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
