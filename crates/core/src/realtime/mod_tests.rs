// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use uuid::Uuid;

use super::*;

#[tokio::test]
async fn a_subscriber_receives_a_message_published_after_it_subscribed() {
    let hub = RealtimeHub::new();
    let topic = exam_queue_topic(Uuid::new_v4(), "suspend");
    let mut rx = hub.subscribe(&topic);

    hub.publish(&topic, "hello".to_owned());

    assert_eq!(rx.recv().await.unwrap(), "hello");
}

#[tokio::test]
async fn publishing_to_a_topic_with_no_subscribers_does_not_error() {
    let hub = RealtimeHub::new();
    hub.publish(&proctor_topic(Uuid::new_v4()), "ignored".to_owned());
}

#[tokio::test]
async fn distinct_topics_do_not_leak_into_each_other() {
    let hub = RealtimeHub::new();
    let exam_a = Uuid::new_v4();
    let exam_b = Uuid::new_v4();
    let mut rx_a = hub.subscribe(&proctor_topic(exam_a));
    let _rx_b = hub.subscribe(&proctor_topic(exam_b));

    hub.publish(&proctor_topic(exam_a), "for-a".to_owned());

    assert_eq!(rx_a.recv().await.unwrap(), "for-a");
}

#[test]
fn well_known_topic_formats_are_stable() {
    let id = Uuid::nil();
    assert_eq!(exam_queue_topic(id, "warning"), format!("/queue/exam/{id}/warning"));
    assert_eq!(exam_queue_topic(id, "suspend"), format!("/queue/exam/{id}/suspend"));
    assert_eq!(proctor_topic(id), format!("/topic/proctor/exam/{id}"));
    assert_eq!(admin_topic(), "/topic/admin");
}
