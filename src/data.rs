use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::goodvibes::{
    self, LocalizedText, MonthlyStandings, RankedCollection, RankedUser, Reaction, Reply, User,
    Vibe, VibesPage, Window,
};

pub trait VibeService: Send + Sync {
    fn load_page(&self, continuation: Option<&str>) -> Result<VibesPage>;
    fn load_window(&self, window: Window, avatar_size: &str) -> Result<VibesPage>;
    fn load_vibe(&self, id: &str) -> Result<Vibe>;
}

pub trait LeaderboardService: Send + Sync {
    fn load_month(&self, year: i32, month: u32, limit: u32) -> Result<MonthlyStandings>;
}

pub struct GoodVibesService {
    client: Arc<goodvibes::Client>,
}

impl GoodVibesService {
    pub fn new(client: Arc<goodvibes::Client>) -> Self {
        Self { client }
    }
}

impl VibeService for GoodVibesService {
    fn load_page(&self, continuation: Option<&str>) -> Result<VibesPage> {
        self.client.list_page(continuation)
    }

    fn load_window(&self, window: Window, avatar_size: &str) -> Result<VibesPage> {
        self.client.cached_window(window, avatar_size)
    }

    fn load_vibe(&self, id: &str) -> Result<Vibe> {
        self.client.vibe(id).context("load replies")
    }
}

pub struct GoodVibesLeaderboardService {
    client: Arc<goodvibes::Client>,
}

impl GoodVibesLeaderboardService {
    pub fn new(client: Arc<goodvibes::Client>) -> Self {
        Self { client }
    }
}

impl LeaderboardService for GoodVibesLeaderboardService {
    fn load_month(&self, year: i32, month: u32, limit: u32) -> Result<MonthlyStandings> {
        self.client
            .monthly_standings(year, month, limit)
            .with_context(|| format!("load leaderboard for {year}-{month:02}"))
    }
}

/// Offline data for `--demo`: a fixed set of vibes spread over the last few months.
#[derive(Debug, Clone)]
pub struct MockVibeService {
    vibes: Vec<Vibe>,
}

impl Default for MockVibeService {
    fn default() -> Self {
        Self {
            vibes: mock_vibes(Utc::now()),
        }
    }
}

impl MockVibeService {
    fn within(&self, window: Window) -> Vec<Vibe> {
        let now = Utc::now();
        let cutoff = match window {
            Window::Days(days) => now - ChronoDuration::days(i64::from(days)),
            Window::Months(months) => now - ChronoDuration::days(30 * i64::from(months)),
        };
        self.vibes
            .iter()
            .filter(|vibe| vibe.creation_date >= cutoff)
            .map(strip_replies)
            .collect()
    }
}

impl VibeService for MockVibeService {
    fn load_page(&self, continuation: Option<&str>) -> Result<VibesPage> {
        const PAGE_SIZE: usize = 3;
        let start = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| anyhow!("mock: bad continuation token {token:?}"))?,
            None => 0,
        };
        let end = (start + PAGE_SIZE).min(self.vibes.len());
        let data = self.vibes[start.min(end)..end]
            .iter()
            .map(strip_replies)
            .collect();
        Ok(VibesPage {
            data,
            metadata: Some(goodvibes::PageMetadata {
                continuation_token: (end < self.vibes.len()).then(|| end.to_string()),
                page_size: Some(PAGE_SIZE as u32),
                total_count: Some(self.vibes.len()),
                cache_ready: None,
            }),
        })
    }

    fn load_window(&self, window: Window, _avatar_size: &str) -> Result<VibesPage> {
        Ok(VibesPage {
            data: self.within(window),
            metadata: Some(goodvibes::PageMetadata {
                total_count: Some(self.vibes.len()),
                cache_ready: Some(true),
                ..Default::default()
            }),
        })
    }

    fn load_vibe(&self, id: &str) -> Result<Vibe> {
        self.vibes
            .iter()
            .find(|vibe| vibe.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("mock: vibe {id} not found"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockLeaderboardService;

impl LeaderboardService for MockLeaderboardService {
    fn load_month(&self, year: i32, month: u32, limit: u32) -> Result<MonthlyStandings> {
        let ranked = |names: &[&str]| -> Vec<RankedUser> {
            names
                .iter()
                .enumerate()
                .take(limit as usize)
                .map(|(idx, name)| RankedUser {
                    user: mock_user(name),
                    count: (names.len() - idx) as u32 * 3 + month % 3,
                })
                .collect()
        };
        Ok(MonthlyStandings {
            year,
            month,
            top_senders: ranked(&["Ada", "Linus", "Grace"][..]),
            top_recipients: ranked(&["Grace", "Ken", "Barbara"][..]),
            top_collections: ["Teamwork", "Kudos", "Thank you"]
                .iter()
                .take(limit as usize)
                .enumerate()
                .map(|(idx, name)| RankedCollection {
                    name: (*name).to_string(),
                    count: 12 - idx as u32 * 4,
                })
                .collect(),
        })
    }
}

fn strip_replies(vibe: &Vibe) -> Vibe {
    Vibe {
        replies: None,
        ..vibe.clone()
    }
}

fn mock_user(name: &str) -> User {
    User {
        user_id: format!("u-{}", name.to_lowercase()),
        display_name: name.to_string(),
        avatar_url: None,
    }
}

fn mock_vibes(now: DateTime<Utc>) -> Vec<Vibe> {
    let entries: [(&str, i64, &str, Option<&str>, &[&str], usize); 7] = [
        ("Thank you for pairing on the release checklist!", 1, "Ada", None, &["Grace"], 0),
        ("", 3, "Linus", Some("Above and beyond"), &["Ken", "Barbara"], 5),
        ("Your demo made the whole floor smile.", 9, "Grace", None, &["Ada"], 1),
        ("Brilliant idea on the cache warmup.", 24, "Ken", None, &["Linus"], 3),
        ("Welcome aboard, happy to have you!", 41, "Barbara", None, &["Margaret"], 0),
        ("Congrats on shipping the migration.", 58, "Margaret", None, &["Ada", "Ken"], 2),
        ("", 75, "Ada", None, &["Barbara"], 0),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(idx, (message, days_ago, sender, prompt, recipients, reply_total))| {
            let created = now - ChronoDuration::days(*days_ago);
            let replies: Vec<Reply> = (0..*reply_total)
                .map(|n| Reply {
                    author_user: mock_user(["Ken", "Grace", "Linus"][n % 3]),
                    message: format!("Reply #{}: well deserved!", n + 1),
                    reply_date: created + ChronoDuration::hours(n as i64 + 1),
                })
                .collect();
            Vibe {
                id: format!("demo-{}", idx + 1),
                collection_id: None,
                collection_name: None,
                card_id: None,
                card_prompt: Some(vec![LocalizedText {
                    text: "You make work better".into(),
                    locale: Some("en".into()),
                }]),
                prompt: prompt.map(str::to_string),
                message: (*message).to_string(),
                sender_user: mock_user(sender),
                creation_date: created,
                is_public: true,
                recipients: recipients.iter().map(|name| mock_user(name)).collect(),
                reactions: vec![
                    Reaction {
                        emoji: "🎉".into(),
                        count: (idx as u32 % 4) + 1,
                    },
                    Reaction {
                        emoji: "❤️".into(),
                        count: 2,
                    },
                ],
                reply_count: replies.len() as u32,
                replies: Some(replies),
            }
        })
        .collect()
}
