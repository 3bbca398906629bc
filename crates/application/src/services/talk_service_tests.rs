//! 会话服务单元测试

use std::sync::Arc;

use uuid::Uuid;

use domain::repositories::TalkRepository;
use domain::{DomainError, MessageKind, UserProfile};

use crate::error::ApplicationError;
use crate::memory::{InMemoryTalkRepository, InMemoryUserRepository};
use crate::services::talk_service::TalkService;

fn setup() -> (TalkService, Arc<InMemoryTalkRepository>, Arc<InMemoryUserRepository>) {
    let talks = Arc::new(InMemoryTalkRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let service = TalkService::new(talks.clone(), users.clone());
    (service, talks, users)
}

#[tokio::test]
async fn get_or_create_is_direction_independent_and_idempotent() {
    let (service, _, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let t1 = service.get_or_create(alice, bob).await.unwrap();
    let t2 = service.get_or_create(bob, alice).await.unwrap();
    let t3 = service.get_or_create(alice, bob).await.unwrap();

    assert_eq!(t1.id, t2.id);
    assert_eq!(t1.id, t3.id);

    // 只存在一行
    let listed = service.list_for_user(alice).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn get_or_create_rejects_same_user() {
    let (service, _, _) = setup();
    let alice = Uuid::new_v4();
    let result = service.get_or_create(alice, alice).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::ValidationError { .. }))
    ));
}

#[tokio::test]
async fn pin_is_one_sided() {
    let (service, talks, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let talk = service.get_or_create(alice, bob).await.unwrap();

    service.set_pinned(talk.id, alice, true).await.unwrap();

    let alice_view = &service.list_for_user(alice).await.unwrap()[0];
    let bob_view = &service.list_for_user(bob).await.unwrap()[0];
    assert!(alice_view.pinned);
    assert!(!bob_view.pinned);

    // 对端一侧的设置行不受影响
    let bob_setting = talks
        .setting_for(talk.id, bob)
        .await
        .unwrap();
    assert!(!bob_setting.pinned && !bob_setting.disabled);
}

#[tokio::test]
async fn outsider_cannot_pin_or_disable() {
    let (service, _, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mallory = Uuid::new_v4();
    let talk = service.get_or_create(alice, bob).await.unwrap();

    assert!(matches!(
        service.set_pinned(talk.id, mallory, true).await,
        Err(ApplicationError::Domain(DomainError::PermissionDenied { .. }))
    ));
    assert!(matches!(
        service.disable(talk.id, mallory).await,
        Err(ApplicationError::Domain(DomainError::PermissionDenied { .. }))
    ));
}

#[tokio::test]
async fn disabled_talk_disappears_from_own_list_only() {
    let (service, _, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let talk = service.get_or_create(alice, bob).await.unwrap();

    service.disable(talk.id, alice).await.unwrap();

    assert!(service.list_for_user(alice).await.unwrap().is_empty());
    assert_eq!(service.list_for_user(bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleted_talk_vanishes_for_both_until_resurrected() {
    let (service, talks, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let talk = service.get_or_create(alice, bob).await.unwrap();

    service.delete(talk.id, bob).await.unwrap();

    // 与 disable 不同，删除对双方都生效
    assert!(service.list_for_user(alice).await.unwrap().is_empty());
    assert!(service.list_for_user(bob).await.unwrap().is_empty());
    assert!(talks.find_by_id(talk.id).await.unwrap().is_none());

    // 再次解析同一对用户时复活同一行，而不是新建
    let revived = service.get_or_create(bob, alice).await.unwrap();
    assert_eq!(revived.id, talk.id);
    assert!(revived.deleted_at.is_none());
    assert_eq!(service.list_for_user(alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn outsider_cannot_delete_talk() {
    let (service, _, _) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mallory = Uuid::new_v4();
    let talk = service.get_or_create(alice, bob).await.unwrap();

    assert!(matches!(
        service.delete(talk.id, mallory).await,
        Err(ApplicationError::Domain(DomainError::PermissionDenied { .. }))
    ));
    assert_eq!(service.list_for_user(alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_is_ordered_by_last_message_time_and_decorated() {
    let (service, talks, users) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let carol = Uuid::new_v4();
    users
        .insert(UserProfile {
            id: carol,
            display_name: "Carol".to_string(),
            avatar_url: None,
        })
        .await;

    let with_bob = service.get_or_create(alice, bob).await.unwrap();
    let with_carol = service.get_or_create(alice, carol).await.unwrap();

    talks
        .update_last_message(with_bob.id, "older", MessageKind::Text)
        .await
        .unwrap();
    talks
        .update_last_message(with_carol.id, "newer", MessageKind::Goods)
        .await
        .unwrap();

    let listed = service.list_for_user(alice).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].talk_id, with_carol.id);
    assert_eq!(listed[0].peer_name.as_deref(), Some("Carol"));
    assert_eq!(listed[0].last_content.as_deref(), Some("newer"));
    assert_eq!(listed[0].last_kind, Some(MessageKind::Goods));
    assert_eq!(listed[1].talk_id, with_bob.id);
    assert!(listed[1].peer_name.is_none());
}

#[tokio::test]
async fn pin_unknown_talk_is_not_found() {
    let (service, _, _) = setup();
    let result = service.set_pinned(Uuid::new_v4(), Uuid::new_v4(), true).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::ResourceNotFound { .. }))
    ));
}
