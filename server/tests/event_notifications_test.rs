mod common;

use std::collections::BTreeSet;

use chrono::{Duration, TimeZone, Utc};
use common::{buyer, fixture, new_venue, now, Fixture};
use eventhub_server::models::{Actor, EventPatch, NotificationPriority, UserId};
use eventhub_server::ticketing::{InputError, NotificationDraft, TicketingError};

fn placement_patch(f: &Fixture) -> EventPatch {
    EventPatch {
        title: None,
        description: None,
        category_id: None,
        scheduled_at: f.event.scheduled_at,
        venue_id: f.event.venue_id,
    }
}

async fn with_holders(f: &Fixture, count: usize) -> Vec<Actor> {
    let mut holders = Vec::with_capacity(count);
    for _ in 0..count {
        let holder = buyer();
        f.ticketing
            .purchase(&holder, f.event.id, 1, "GENERAL")
            .await
            .unwrap();
        holders.push(holder);
    }
    holders
}

#[tokio::test]
async fn test_date_change_notifies_every_holder_once() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 2).await;
    let bystander = buyer();

    // 2025-07-01 20:00 local, same time of day as before.
    let patch = EventPatch {
        scheduled_at: Utc.with_ymd_and_hms(2025, 7, 1, 23, 0, 0).unwrap(),
        ..placement_patch(&f)
    };
    let edit = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();

    let dispatched = edit.notification.expect("date change must notify");
    assert_eq!(dispatched.notification.title, "Cambios en el evento");
    assert_eq!(dispatched.notification.priority, NotificationPriority::High);
    assert_eq!(dispatched.notification.event_id, Some(f.event.id));
    assert_eq!(
        dispatched.notification.message,
        "Se modificaron los siguientes datos del evento:\nNueva fecha: 01/07/2025"
    );
    assert_eq!(
        dispatched.recipients,
        holders.iter().map(|h| h.user_id).collect::<BTreeSet<_>>()
    );

    for holder in &holders {
        let inbox = f.ticketing.inbox(holder).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].is_read);
    }
    assert!(f.ticketing.inbox(&bystander).await.unwrap().is_empty());
    assert_eq!(
        f.ticketing
            .event_notifications(&f.organizer, f.event.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_descriptive_edit_sends_nothing() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 2).await;

    let patch = EventPatch {
        title: Some("Recital renovado".to_string()),
        description: Some("Nueva descripción".to_string()),
        ..placement_patch(&f)
    };
    let edit = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();

    assert!(edit.notification.is_none());
    assert_eq!(edit.event.title, "Recital renovado");
    assert_eq!(edit.event.description, "Nueva descripción");
    assert!(f
        .ticketing
        .event_notifications(&f.organizer, f.event.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(f.ticketing.unread_count(&holders[0]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sub_minute_shift_is_not_significant() {
    let f = fixture(10).await;
    with_holders(&f, 1).await;

    let patch = EventPatch {
        scheduled_at: f.event.scheduled_at + Duration::seconds(30),
        ..placement_patch(&f)
    };
    let edit = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();
    assert!(edit.notification.is_none());
    assert_eq!(edit.event.scheduled_at, f.event.scheduled_at + Duration::seconds(30));
}

#[tokio::test]
async fn test_time_and_venue_change_are_summarized() {
    let f = fixture(10).await;
    with_holders(&f, 3).await;
    let bigger = f
        .ticketing
        .create_venue(&f.organizer, new_venue("Luna Park", 500))
        .await
        .unwrap();

    let patch = EventPatch {
        scheduled_at: f.event.scheduled_at + Duration::minutes(90),
        venue_id: bigger.id,
        ..placement_patch(&f)
    };
    let edit = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();

    let dispatched = edit.notification.unwrap();
    assert_eq!(
        dispatched.notification.message,
        "Se modificaron los siguientes datos del evento:\nNueva hora: 21:30\nNuevo lugar: Luna Park"
    );
    assert_eq!(dispatched.recipients.len(), 3);
    assert_eq!(edit.event.venue_id, bigger.id);
}

#[tokio::test]
async fn test_event_without_holders_still_records_notification() {
    let f = fixture(10).await;
    let patch = EventPatch {
        scheduled_at: f.event.scheduled_at + Duration::days(1),
        ..placement_patch(&f)
    };
    let edit = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();

    let dispatched = edit.notification.unwrap();
    assert!(dispatched.recipients.is_empty());
}

#[tokio::test]
async fn test_every_significant_edit_notifies_again() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 1).await;

    for days in [1, 2] {
        let patch = EventPatch {
            scheduled_at: f.event.scheduled_at + Duration::days(days),
            ..placement_patch(&f)
        };
        f.ticketing
            .edit_event(&f.organizer, f.event.id, patch)
            .await
            .unwrap();
    }

    assert_eq!(f.ticketing.unread_count(&holders[0]).await.unwrap(), 2);
    assert_eq!(
        f.ticketing
            .event_notifications(&f.organizer, f.event.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_refunded_user_is_not_notified() {
    let f = fixture(10).await;
    let stayer = buyer();
    let leaver = buyer();
    f.ticketing
        .purchase(&stayer, f.event.id, 2, "GENERAL")
        .await
        .unwrap();
    let ticket = f
        .ticketing
        .purchase(&leaver, f.event.id, 2, "GENERAL")
        .await
        .unwrap();
    f.ticketing
        .refund_ticket(&f.organizer, ticket.id)
        .await
        .unwrap();

    let patch = EventPatch {
        scheduled_at: f.event.scheduled_at + Duration::days(3),
        ..placement_patch(&f)
    };
    let dispatched = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap()
        .notification
        .unwrap();

    assert_eq!(
        dispatched.recipients.into_iter().collect::<Vec<_>>(),
        vec![stayer.user_id]
    );
    assert_eq!(f.ticketing.unread_count(&leaver).await.unwrap(), 0);
}

#[tokio::test]
async fn test_venue_too_small_rolls_back_the_edit() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 4).await;
    let tiny = f
        .ticketing
        .create_venue(&f.organizer, new_venue("Café Vinilo", 3))
        .await
        .unwrap();

    let patch = EventPatch {
        venue_id: tiny.id,
        ..placement_patch(&f)
    };
    let err = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketingError::VenueTooSmall {
            capacity: 3,
            sold: 4
        }
    ));

    let event = f.ticketing.event(f.event.id).await.unwrap();
    assert_eq!(event.venue_id, f.venue.id);
    assert_eq!(f.ticketing.unread_count(&holders[0]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_only_the_owning_organizer_edits() {
    let f = fixture(10).await;
    let other_organizer = Actor::organizer(UserId::new());

    for actor in [other_organizer, buyer()] {
        let err = f
            .ticketing
            .edit_event(&actor, f.event.id, placement_patch(&f))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketingError::Forbidden(_)));
    }
}

#[tokio::test]
async fn test_reschedule_must_stay_in_the_future() {
    let f = fixture(10).await;
    let patch = EventPatch {
        scheduled_at: now() + Duration::hours(2),
        ..placement_patch(&f)
    };
    let err = f
        .ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketingError::InvalidInput(InputError::ScheduleNotInFuture)
    ));
}

#[tokio::test]
async fn test_inbox_read_tracking() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 1).await;
    let holder = &holders[0];

    let dispatched = f
        .ticketing
        .publish_notification(
            &f.organizer,
            f.event.id,
            NotificationDraft {
                title: "Apertura de puertas".to_string(),
                message: "Las puertas abren a las 19:00".to_string(),
                priority: NotificationPriority::Normal,
            },
        )
        .await
        .unwrap();
    let id = dispatched.notification.id;
    assert_eq!(f.ticketing.unread_count(holder).await.unwrap(), 1);

    f.ticketing.mark_read(holder, id).await.unwrap();
    assert_eq!(f.ticketing.unread_count(holder).await.unwrap(), 0);
    assert!(f.ticketing.inbox(holder).await.unwrap()[0].is_read);

    let err = f.ticketing.mark_read(&buyer(), id).await.unwrap_err();
    assert!(matches!(err, TicketingError::NotFound("notification")));
}

#[tokio::test]
async fn test_manual_notifications_reject_exact_repeats() {
    let f = fixture(10).await;
    with_holders(&f, 2).await;
    let draft = NotificationDraft {
        title: "Cambio de puerta".to_string(),
        message: "Ingreso por la calle lateral".to_string(),
        priority: NotificationPriority::Low,
    };

    f.ticketing
        .publish_notification(&f.organizer, f.event.id, draft.clone())
        .await
        .unwrap();
    let err = f
        .ticketing
        .publish_notification(&f.organizer, f.event.id, draft.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::DuplicateNotification));

    let reworded = NotificationDraft {
        message: "Ingreso por la calle Lavalle".to_string(),
        ..draft
    };
    f.ticketing
        .publish_notification(&f.organizer, f.event.id, reworded.clone())
        .await
        .unwrap();

    let err = f
        .ticketing
        .publish_notification(&buyer(), f.event.id, reworded)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::Forbidden(_)));
}

#[tokio::test]
async fn test_deleting_an_event_keeps_delivered_notifications() {
    let f = fixture(10).await;
    let holders = with_holders(&f, 1).await;
    let patch = EventPatch {
        scheduled_at: f.event.scheduled_at + Duration::days(1),
        ..placement_patch(&f)
    };
    f.ticketing
        .edit_event(&f.organizer, f.event.id, patch)
        .await
        .unwrap();

    f.ticketing
        .delete_event(&f.organizer, f.event.id)
        .await
        .unwrap();

    let inbox = f.ticketing.inbox(&holders[0]).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].notification.event_id, None);
    assert!(matches!(
        f.ticketing.event(f.event.id).await,
        Err(TicketingError::NotFound("event"))
    ));
    f.ticketing
        .delete_venue(&f.organizer, f.venue.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_venue_with_events_cannot_be_deleted() {
    let f = fixture(10).await;
    let err = f
        .ticketing
        .delete_venue(&f.organizer, f.venue.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::VenueInUse));
}
