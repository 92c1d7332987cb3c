//! Chat notices summarising a planned phase or the guild's readiness.
//!
//! The crate only builds the message and hands it to a [`Notifier`].
//! Posting to a webhook is left to whatever consumes the outbox.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::planner::PhasePlan;
use crate::platoon::readiness::GuildReadiness;
use crate::platoon::types::PlatoonKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub fields: Vec<NoticeField>,
}

impl Notice {
    pub fn new(title: impl Into<String>) -> Self {
        Notice {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Webhook body with the notice as its single embed
    pub fn to_webhook_payload(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect();
        json!({ "embeds": [{ "title": self.title, "fields": fields }] })
    }
}

fn platoon_list(keys: &[PlatoonKey]) -> String {
    if keys.is_empty() {
        return "none".to_string();
    }
    keys.iter()
        .map(|k| (k.platoon + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One field per open territory listing which platoons can be filled.
pub fn plan_notice(plan: &PhasePlan) -> Notice {
    let mut notice = Notice::new(format!("{} - Phase {} platoons", plan.event, plan.phase));

    for territory in plan.territories.iter().filter(|t| t.is_live()) {
        let (mut feasible, mut skipped) = (Vec::new(), Vec::new());
        for outcome in plan
            .result
            .platoons
            .iter()
            .filter(|p| p.key.territory == territory.index)
        {
            if outcome.possible {
                feasible.push(outcome.key);
            } else {
                skipped.push(outcome.key);
            }
        }
        feasible.sort();
        skipped.sort();
        notice = notice.field(
            format!("{} ({})", territory.name, territory.kind),
            format!(
                "Fill: {}\nSkip: {}",
                platoon_list(&feasible),
                platoon_list(&skipped)
            ),
            true,
        );
    }

    let missing = plan.result.missing_units();
    let value = if missing.is_empty() {
        "none".to_string()
    } else {
        missing.into_iter().collect::<Vec<_>>().join(", ")
    };
    notice.field("Missing units", value, false)
}

pub fn readiness_notice(guild: &GuildReadiness) -> Notice {
    let notice = Notice::new("Guild readiness");
    let notice = guild.phase_totals.iter().fold(notice, |n, (phase, count)| {
        n.field(format!("Phase {}", phase), count.to_string(), true)
    });
    notice.field("Total", guild.total.to_string(), false)
}

/// Delivery channel for notices
pub trait Notifier {
    fn send(&self, notice: &Notice) -> Result<()>;
}

/// Appends webhook payloads to a file, one JSON document per line, tagged
/// with the destination URL.
pub struct FileOutbox {
    path: PathBuf,
    webhook_url: String,
}

impl FileOutbox {
    pub fn new<P: AsRef<Path>>(path: P, webhook_url: impl Into<String>) -> Self {
        FileOutbox {
            path: path.as_ref().to_path_buf(),
            webhook_url: webhook_url.into(),
        }
    }
}

impl Notifier for FileOutbox {
    fn send(&self, notice: &Notice) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = json!({ "url": self.webhook_url, "payload": notice.to_webhook_payload() });
        writeln!(file, "{}", serde_json::to_string(&line)?)?;
        info!("Queued notice {:?} in {}", notice.title, self.path.display());
        Ok(())
    }
}

/// Sends `notice` when a webhook is configured, otherwise logs and moves on.
pub fn deliver(webhook_url: Option<&str>, outbox: &Path, notice: &Notice) -> Result<()> {
    match webhook_url {
        Some(url) => FileOutbox::new(outbox, url).send(notice),
        None => {
            warn!("No webhook configured, not sending {:?}", notice.title);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platoon::demand::{build_phase, PlanMode};
    use crate::platoon::engine::{AssignmentResult, PlatoonOutcome};
    use crate::platoon::event::EventType;
    use std::collections::BTreeMap;

    fn outcome(territory: u8, platoon: u8, possible: bool) -> PlatoonOutcome {
        PlatoonOutcome {
            key: PlatoonKey { territory, platoon },
            possible,
            manual_skip: false,
            insufficient: Vec::new(),
            value: 0,
        }
    }

    fn plan() -> PhasePlan {
        let platoons = (0..6)
            .map(|p| outcome(1, p, p != 4))
            .chain((0..6).map(|p| outcome(0, p, false)))
            .collect();
        PhasePlan {
            event: EventType::HothDark,
            phase: 1,
            mode: PlanMode::Reset,
            territories: build_phase(EventType::HothDark, 1),
            result: AssignmentResult {
                slots: Vec::new(),
                platoons,
                demand: BTreeMap::new(),
                placements: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn plan_notice_lists_platoons_per_territory() {
        let notice = plan_notice(&plan());
        assert_eq!(notice.title, "Hoth (Dark Side) - Phase 1 platoons");
        // Two live territories plus the missing-units line
        assert_eq!(notice.fields.len(), 3);
        assert_eq!(notice.fields[0].value, "Fill: none\nSkip: 1, 2, 3, 4, 5, 6");
        assert_eq!(notice.fields[1].value, "Fill: 1, 2, 3, 4, 6\nSkip: 5");
        assert_eq!(notice.fields[2].value, "none");
    }

    #[test]
    fn payload_wraps_a_single_embed() {
        let notice = Notice::new("Guild readiness").field("Total", "12", false);
        let payload = notice.to_webhook_payload();
        assert_eq!(payload["embeds"][0]["title"], "Guild readiness");
        assert_eq!(payload["embeds"][0]["fields"][0]["value"], "12");
        assert_eq!(payload["embeds"][0]["fields"][0]["inline"], false);
    }

    #[test]
    fn readiness_notice_has_a_field_per_phase() {
        let guild = GuildReadiness {
            columns: Vec::new(),
            members: Vec::new(),
            phase_totals: [(1, 4), (2, 7)].into_iter().collect(),
            total: 11,
        };
        let notice = readiness_notice(&guild);
        let names: Vec<&str> = notice.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Phase 1", "Phase 2", "Total"]);
    }

    #[test]
    fn outbox_appends_one_line_per_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let notice = Notice::new("a");
        deliver(Some("https://hooks.invalid/x"), &path, &notice).unwrap();
        deliver(Some("https://hooks.invalid/x"), &path, &notice).unwrap();
        deliver(None, &path, &notice).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["url"], "https://hooks.invalid/x");
        assert_eq!(first["payload"]["embeds"][0]["title"], "a");
    }
}
