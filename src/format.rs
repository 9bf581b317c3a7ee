use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use ratatui::style::Color;

use crate::goodvibes::{Reaction, Vibe};

pub const EMPTY_MESSAGE: &str = "No message - just good vibes! ✨";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Pink, blue, teal, orange, green, yellow.
const VIBE_COLORS: [Color; 6] = [
    Color::Rgb(245, 194, 231),
    Color::Rgb(137, 180, 250),
    Color::Rgb(148, 226, 213),
    Color::Rgb(250, 179, 135),
    Color::Rgb(166, 227, 161),
    Color::Rgb(249, 226, 175),
];

/// Accent color for the vibe at `index`; stable for a given position.
pub fn vibe_color(index: usize) -> Color {
    VIBE_COLORS[index % VIBE_COLORS.len()]
}

/// `"Oct 16, 2026"`, in whatever zone the date carries.
pub fn format_date<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.format("%b %-d, %Y").to_string()
}

/// Full English month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_NAMES.get(idx as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// The card's prompt: a custom prompt wins over the first localized one.
pub fn prompt_text(vibe: &Vibe) -> Option<&str> {
    let custom = vibe
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty());
    custom.or_else(|| {
        vibe.card_prompt
            .as_ref()
            .and_then(|prompts| prompts.first())
            .map(|prompt| prompt.text.trim())
            .filter(|text| !text.is_empty())
    })
}

pub fn collection_label(vibe: &Vibe) -> Option<&str> {
    vibe.collection_name
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.text.trim())
        .filter(|text| !text.is_empty())
}

pub fn display_message(vibe: &Vibe) -> String {
    let message = vibe.message.trim();
    if !message.is_empty() {
        return message.to_string();
    }
    let card = vibe
        .card_prompt
        .as_ref()
        .and_then(|prompts| prompts.first())
        .map(|prompt| prompt.text.trim())
        .filter(|text| !text.is_empty());
    let prompt = vibe
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty());
    match card.or(prompt) {
        Some(text) => format!("\"{text}\""),
        None => EMPTY_MESSAGE.to_string(),
    }
}

pub fn reply_count_label(count: usize) -> String {
    if count == 1 {
        "1 Reply".to_string()
    } else {
        format!("{count} Replies")
    }
}

pub fn reaction_title(reaction: &Reaction) -> String {
    let who = if reaction.count == 1 { "person" } else { "people" };
    format!("{} {who} reacted with {}", reaction.count, reaction.emoji)
}

/// Avatar size to request from the backend for a display of the given size.
pub fn avatar_size(width: u32, height: u32) -> &'static str {
    match width.min(height) {
        2160.. => "256x256",
        1440.. => "192x192",
        1080.. => "128x128",
        _ => "96x96",
    }
}

pub fn position_label(index: usize, total: usize) -> String {
    format!("{} of {}", index + 1, total)
}

/// Up to two initials for an avatar placeholder.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::collection::tests::vibe;
    use crate::goodvibes::LocalizedText;

    fn card(text: &str) -> Option<Vec<LocalizedText>> {
        Some(vec![LocalizedText {
            text: text.into(),
            locale: Some("en".into()),
        }])
    }

    #[test]
    fn dates_use_short_month() {
        let date = Utc.with_ymd_and_hms(2026, 10, 6, 9, 30, 0).unwrap();
        assert_eq!(format_date(&date), "Oct 6, 2026");
        assert_eq!(month_name(10), "October");
        assert_eq!(month_name(0), "Unknown");
        assert_eq!(month_name(13), "Unknown");
    }

    #[test]
    fn colors_cycle_through_palette() {
        assert_eq!(vibe_color(0), vibe_color(6));
        assert_ne!(vibe_color(0), vibe_color(1));
        assert_eq!(vibe_color(11), VIBE_COLORS[5]);
    }

    #[test]
    fn message_falls_back_in_order() {
        let mut sample = vibe("a", 1, 0);
        sample.message = "  Thanks for the help!  ".into();
        assert_eq!(display_message(&sample), "Thanks for the help!");

        sample.message = "   ".into();
        sample.card_prompt = card("You rock");
        sample.prompt = Some("Custom".into());
        assert_eq!(display_message(&sample), "\"You rock\"");

        sample.card_prompt = None;
        assert_eq!(display_message(&sample), "\"Custom\"");

        sample.prompt = None;
        assert_eq!(display_message(&sample), EMPTY_MESSAGE);
    }

    #[test]
    fn custom_prompt_wins() {
        let mut sample = vibe("a", 1, 0);
        sample.card_prompt = card("Team player");
        assert_eq!(prompt_text(&sample), Some("Team player"));
        sample.prompt = Some("Above and beyond".into());
        assert_eq!(prompt_text(&sample), Some("Above and beyond"));
        sample.prompt = Some(" ".into());
        assert_eq!(prompt_text(&sample), Some("Team player"));
    }

    #[test]
    fn labels_pluralize() {
        assert_eq!(reply_count_label(1), "1 Reply");
        assert_eq!(reply_count_label(0), "0 Replies");
        assert_eq!(reply_count_label(7), "7 Replies");
        let one = Reaction {
            emoji: "🎉".into(),
            count: 1,
        };
        assert_eq!(reaction_title(&one), "1 person reacted with 🎉");
        let many = Reaction {
            emoji: "❤️".into(),
            count: 4,
        };
        assert_eq!(reaction_title(&many), "4 people reacted with ❤️");
        assert_eq!(position_label(0, 12), "1 of 12");
    }

    #[test]
    fn avatar_buckets_use_shorter_side() {
        assert_eq!(avatar_size(3840, 2160), "256x256");
        assert_eq!(avatar_size(2560, 1440), "192x192");
        assert_eq!(avatar_size(1920, 1080), "128x128");
        assert_eq!(avatar_size(1080, 1920), "128x128");
        assert_eq!(avatar_size(1366, 768), "96x96");
    }

    #[test]
    fn initials_take_two_words() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("grace brewster hopper"), "GB");
        assert_eq!(initials(""), "");
    }
}
