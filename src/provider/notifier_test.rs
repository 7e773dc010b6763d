use super::*;

fn user(uid: &str) -> ProviderUser {
    ProviderUser::new(uid, Some(format!("{uid}@example.com")))
}

#[test]
fn subscribe_delivers_current_value_immediately() {
    let mut notifier = Notifier::default();
    let mut rx = notifier.subscribe();
    assert_eq!(rx.try_recv().unwrap(), None);
}

#[test]
fn publish_fans_out_to_every_listener() {
    let mut notifier = Notifier::default();
    let mut a = notifier.subscribe();
    let mut b = notifier.subscribe();
    let _ = a.try_recv();
    let _ = b.try_recv();

    assert!(notifier.publish(Some(user("u1"))));
    assert_eq!(a.try_recv().unwrap().unwrap().uid, "u1");
    assert_eq!(b.try_recv().unwrap().unwrap().uid, "u1");
}

#[test]
fn publish_same_value_is_silent() {
    let mut notifier = Notifier::default();
    let mut rx = notifier.subscribe();
    let _ = rx.try_recv();

    assert!(!notifier.publish(None));
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_listeners_are_pruned() {
    let mut notifier = Notifier::default();
    let rx = notifier.subscribe();
    let _keep = notifier.subscribe();
    drop(rx);

    assert_eq!(notifier.listener_count(), 1);
    notifier.publish(Some(user("u1")));
    assert_eq!(notifier.listeners.len(), 1);
}

#[test]
fn late_subscriber_sees_latest_user() {
    let mut notifier = Notifier::default();
    notifier.publish(Some(user("u2")));
    let mut rx = notifier.subscribe();
    assert_eq!(rx.try_recv().unwrap().unwrap().uid, "u2");
    assert_eq!(notifier.current().map(|u| u.uid.as_str()), Some("u2"));
}
