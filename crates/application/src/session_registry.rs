//! 会话注册表
//!
//! "用户 X 当前是否可达、在哪条连接上" 的唯一事实来源。
//! 单把 RwLock 守护整个 map：条目数量相对锁开销很小，且
//! 驱逐旧会话与写入新会话必须是一个原子动作，才能维持
//! 每用户至多一个会话的不变量。锁内只做内存操作，从不跨 I/O。

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use domain::ServerFrame;

/// 一条在线连接的句柄：连接 id + 出站帧通道
///
/// 从不落盘；进程重启后在线状态完全由存活连接重建。
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub connection_id: Uuid,
    sender: mpsc::UnboundedSender<ServerFrame>,
}

impl SessionHandle {
    pub fn new(connection_id: Uuid, sender: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self {
            connection_id,
            sender,
        }
    }

    /// 向连接推送一帧；通道已关闭视为失败
    fn send(&self, frame: ServerFrame) -> bool {
        self.sender.send(frame).is_ok()
    }
}

/// 投递结果：接收方离线是预期路径，不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverOutcome {
    Delivered,
    Offline,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册用户的新连接
    ///
    /// 已有会话先收到 OFFLINE 通知再被驱逐；通知经 unbounded channel
    /// 发送，不会在慢连接上阻塞。驱逐与写入在同一把写锁内完成。
    pub async fn register(&self, user_id: Uuid, handle: SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if let Some(old) = sessions.insert(user_id, handle) {
            info!(user_id = %user_id, connection_id = %old.connection_id, "重复登录，驱逐旧会话");
            // 尽力而为：通道关闭说明旧连接已经自行退出
            if !old.send(ServerFrame::offline("账号已在其他地方登录")) {
                debug!(user_id = %user_id, "旧会话通道已关闭，跳过离线通知");
            }
            // old 在此被 drop，旧连接的发送端随之关闭，发送任务退出并关闭 socket
        }
    }

    /// 注销用户会话
    ///
    /// 仅当存储的句柄仍属于 connection_id 时移除：防止旧连接的
    /// 关闭回调在新会话已经顶替之后误删新会话。
    pub async fn unregister(&self, user_id: Uuid, connection_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&user_id) {
            Some(current) if current.connection_id == connection_id => {
                sessions.remove(&user_id);
                debug!(user_id = %user_id, connection_id = %connection_id, "会话已注销");
            }
            Some(_) => {
                debug!(user_id = %user_id, connection_id = %connection_id, "会话已被新连接顶替，跳过注销");
            }
            None => {}
        }
    }

    /// 向在线用户推送一帧
    ///
    /// 不做排队或存储转发：消息的持久性由消息存储负责，
    /// 离线的接收方在下次连接时通过未读/历史恢复。
    pub async fn deliver(&self, user_id: Uuid, frame: ServerFrame) -> DeliverOutcome {
        let sessions = self.sessions.read().await;
        match sessions.get(&user_id) {
            Some(handle) => {
                if handle.send(frame) {
                    DeliverOutcome::Delivered
                } else {
                    warn!(user_id = %user_id, "会话通道已关闭，按离线处理");
                    DeliverOutcome::Offline
                }
            }
            None => DeliverOutcome::Offline,
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
