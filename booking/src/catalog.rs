//! Static seed data: the resort listing, the bookable rooms and the reviews
//! guests left before this session.

use crate::types::{Resort, ResortId, Review, Room};
use chrono::{DateTime, Utc};

/// Resort shown first when nothing else is configured
pub const DEFAULT_RESORT: &str = "bishoftu";

/// The resort listing, in display order
#[must_use]
pub fn resorts() -> Vec<Resort> {
    vec![
        listing("awash", "Kuriftu Resort & Spa Awash Falls", "Awash, Ethiopia", 250, false),
        listing("bishoftu", "Kuriftu Resort & Spa Bishoftu", "Bishoftu, Ethiopia", 173, true),
        listing("entoto", "Kuriftu Resort & Spa Entoto", "Addis Ababa, Ethiopia", 135, true),
        listing("tana", "Kuriftu Resort & Spa Lake Tana", "Bahir Dar, Ethiopia", 135, true),
    ]
}

/// Look up a listed resort
#[must_use]
pub fn resort(id: &ResortId) -> Option<Resort> {
    resorts().into_iter().find(|resort| &resort.id == id)
}

/// Rooms offered at every resort when a session starts
#[must_use]
pub fn rooms() -> Vec<Room> {
    vec![
        Room::new("lake-view-suite", "Ethiopia", 250)
            .with_description(
                "Luxurious suite overlooking the serene lake with a private balcony, \
                 perfect for romantic getaways or peaceful retreats.",
            )
            .with_amenities(["Lake View", "Private Balcony", "King Size Bed", "Premium WiFi"]),
        Room::new("garden-villa", "Djibuti", 350)
            .with_description(
                "Spacious villa surrounded by lush gardens, featuring traditional \
                 Ethiopian architecture with modern amenities.",
            )
            .with_amenities(["Private Garden", "Living Room", "Mini Bar", "Outdoor Shower"]),
        Room::new("presidential-suite", "Eritrea", 500)
            .with_description(
                "Our most exclusive accommodation with panoramic views, butler service, \
                 and the ultimate luxury experience.",
            )
            .with_amenities(["Butler Service", "Private Pool", "Dining Room", "Spa Bath"]),
    ]
}

/// Reviews already on the listing, per resort
#[must_use]
pub fn reviews() -> Vec<(ResortId, Vec<Review>)> {
    vec![
        (
            ResortId::new("awash"),
            seeded(&[(4, "Beautiful scenery!"), (5, "Amazing place."), (5, "Loved the spa.")]),
        ),
        (
            ResortId::new("bishoftu"),
            seeded(&[(3, "Nice view."), (4, "Peaceful environment.")]),
        ),
        (
            ResortId::new("entoto"),
            seeded(&[
                (5, "Excellent service!"),
                (5, "Great value."),
                (4, "Clean rooms."),
                (4, "Will visit again!"),
            ]),
        ),
    ]
}

fn seeded(ratings: &[(u8, &str)]) -> Vec<Review> {
    ratings
        .iter()
        .map(|(rating, comment)| Review {
            rating: *rating,
            author: "Guest".to_string(),
            comment: (*comment).to_string(),
            timestamp: seeded_at(),
        })
        .collect()
}

fn listing(id: &str, name: &str, location: &str, price: u32, available: bool) -> Resort {
    Resort {
        id: ResortId::new(id),
        name: name.to_string(),
        location: location.to_string(),
        price,
        available,
    }
}

fn seeded_at() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}
