//! Order independence and field coverage of the content fingerprint.

use ecal_calendar::{fingerprint, has_changed, CalendarEvent};
use proptest::prelude::*;

fn arb_event() -> impl Strategy<Value = CalendarEvent> {
    (
        "[A-Za-z ]{1,12}",
        0u32..28,
        0u32..3,
        "[a-z]{0,6}",
        "[a-z]{0,6}",
        prop::sample::select(vec!["family", "work", "school"]),
        prop::option::of(prop::sample::select(vec!["#e60000", "#0057e7"])),
    )
        .prop_map(|(title, day, len, description, location, calendar, color)| {
            CalendarEvent {
                title,
                start: format!("2024-05-{:02}", day + 1),
                end: format!("2024-05-{:02}", day + 1 + len),
                all_day: true,
                background_color: color.map(str::to_string),
                border_color: color.map(str::to_string),
                description,
                location,
                calendar_id: calendar.to_string(),
            }
        })
}

fn arb_events() -> impl Strategy<Value = Vec<CalendarEvent>> {
    prop::collection::vec(arb_event(), 0..12)
}

proptest! {
    #[test]
    fn shuffling_keeps_the_fingerprint(
        (original, shuffled) in arb_events()
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle()))
    ) {
        prop_assert_eq!(fingerprint(&original), fingerprint(&shuffled));
    }

    #[test]
    fn colours_are_not_hashed(mut events in arb_events(), recolor in any::<bool>()) {
        let before = fingerprint(&events);
        let color = if recolor { "#ffd600" } else { "#000000" };
        for event in &mut events {
            event.set_color(color);
        }
        prop_assert_eq!(fingerprint(&events), before);
    }

    #[test]
    fn title_changes_move_the_fingerprint(
        events in prop::collection::vec(arb_event(), 1..8),
        index in any::<prop::sample::Index>(),
    ) {
        let mut renamed = events.clone();
        let i = index.index(renamed.len());
        // Generated titles never contain digits, so this key is new
        renamed[i].title = format!("renamed-{}", i);
        prop_assert!(has_changed(Some(&fingerprint(&events)), &fingerprint(&renamed)));
    }
}

#[test]
fn changing_a_title_changes_the_fingerprint() {
    let event = CalendarEvent {
        title: "Dentist".to_string(),
        start: "2024-05-20T09:00:00Z".to_string(),
        end: "2024-05-20T09:30:00Z".to_string(),
        all_day: false,
        background_color: Some("#e60000".to_string()),
        border_color: Some("#e60000".to_string()),
        description: String::new(),
        location: String::new(),
        calendar_id: "family".to_string(),
    };
    let mut renamed = event.clone();
    renamed.title = "Doctor".to_string();

    let before = fingerprint(&[event]);
    let after = fingerprint(&[renamed]);
    assert!(has_changed(Some(&before), &after));
}

#[test]
fn identical_polls_in_different_order_match() {
    let a = CalendarEvent {
        title: "A".to_string(),
        start: "2024-05-20".to_string(),
        end: "2024-05-21".to_string(),
        all_day: true,
        background_color: None,
        border_color: None,
        description: "x".to_string(),
        location: String::new(),
        calendar_id: "family".to_string(),
    };
    let mut b = a.clone();
    b.title = "B".to_string();
    b.calendar_id = "work".to_string();

    let first_poll = fingerprint(&[a.clone(), b.clone()]);
    let second_poll = fingerprint(&[b, a]);
    assert!(!has_changed(Some(&first_poll), &second_poll));
}
