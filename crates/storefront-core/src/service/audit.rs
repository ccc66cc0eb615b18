//! Audit trail
//!
//! Events logged with target `storefront::audit` are picked up by
//! [`AuditLayer`] and stored in the `logs` table by a background writer.

use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::AUDIT_TARGET;
use storefront_persistence::Page;
use storefront_persistence::entity::logs;
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::*;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::service::report::{DateRange, TimeGroup};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewLogEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub level: String,
    pub message: String,
    pub long_message: Option<String>,
    pub is_staff: bool,
}

#[derive(Default)]
struct AuditVisitor {
    entry: NewLogEntry,
}

impl Visit for AuditVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "user" => self.entry.user = value.to_string(),
            "long_message" => self.entry.long_message = Some(value.to_string()),
            "message" => self.entry.message = value.to_string(),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "is_staff" {
            self.entry.is_staff = value;
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        match field.name() {
            "message" => self.entry.message = format!("{:?}", value),
            "user" => self.entry.user = format!("{:?}", value),
            "long_message" => self.entry.long_message = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

/// Forwards audit events to the writer task
pub struct AuditLayer {
    sender: mpsc::UnboundedSender<NewLogEntry>,
}

impl AuditLayer {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NewLogEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl<S: Subscriber> Layer<S> for AuditLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != AUDIT_TARGET {
            return;
        }

        let mut visitor = AuditVisitor::default();
        event.record(&mut visitor);

        let mut entry = visitor.entry;
        entry.timestamp = Utc::now();
        entry.level = level_name(metadata.level()).to_string();

        // The receiver only goes away on shutdown
        let _ = self.sender.send(entry);
    }
}

pub async fn insert_entry(
    db: &impl ConnectionTrait,
    entry: NewLogEntry,
) -> anyhow::Result<logs::Model> {
    let model = logs::ActiveModel {
        timestamp: Set(entry.timestamp),
        user: Set(entry.user),
        level: Set(entry.level),
        message: Set(entry.message),
        long_message: Set(entry.long_message),
        is_staff: Set(entry.is_staff),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(model)
}

/// Store audit entries until every sender is dropped.
pub fn spawn_writer(
    db: DatabaseConnection,
    mut receiver: mpsc::UnboundedReceiver<NewLogEntry>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Audit writer started");

        while let Some(entry) = receiver.recv().await {
            if let Err(e) = insert_entry(&db, entry).await {
                tracing::error!(error = %e, "Failed to store audit entry");
            }
        }

        tracing::info!("Audit writer stopped");
    })
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSearch {
    pub user: String,
    pub level: String,
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
    /// `true` keeps entries with a long message, `false` those without
    pub long_message: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub level: String,
    pub message: String,
    pub long_message: Option<String>,
    pub is_staff: bool,
}

impl From<logs::Model> for LogEntry {
    fn from(value: logs::Model) -> Self {
        Self {
            id: value.id,
            timestamp: value.timestamp,
            user: value.user,
            level: value.level,
            message: value.message,
            long_message: value.long_message,
            is_staff: value.is_staff,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCount {
    pub period: NaiveDate,
    pub count: u64,
}

impl LogSearch {
    fn range(&self) -> DateRange {
        DateRange {
            after: self.after,
            before: self.before,
        }
    }
}

fn filtered(search: &LogSearch) -> Select<logs::Entity> {
    let range = search.range();
    let mut select = logs::Entity::find();

    if !search.user.is_empty() {
        select = select.filter(ilike(logs::Column::User, &search.user));
    }
    if !search.level.is_empty() {
        select = select.filter(ilike(logs::Column::Level, &search.level));
    }
    if let Some(start) = range.start() {
        select = select.filter(logs::Column::Timestamp.gte(start));
    }
    if let Some(end) = range.end() {
        select = select.filter(logs::Column::Timestamp.lt(end));
    }
    match search.long_message {
        Some(true) => select = select.filter(logs::Column::LongMessage.is_not_null()),
        Some(false) => select = select.filter(logs::Column::LongMessage.is_null()),
        None => {}
    }

    select
}

pub async fn list_logs(
    db: &DatabaseConnection,
    search: &LogSearch,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<LogEntry>> {
    let select = filtered(search);

    let total_count = count(select.clone(), db).await?;
    if total_count == 0 {
        return Ok(Page::empty());
    }

    let page_no = page_no.max(1);
    let rows = select
        .order_by_desc(logs::Column::Timestamp)
        .order_by_desc(logs::Column::Id)
        .offset((page_no - 1) * page_size)
        .limit(page_size)
        .all(db)
        .await?;

    Ok(Page::new(
        total_count,
        page_no,
        page_size,
        rows.into_iter().map(LogEntry::from).collect(),
    ))
}

/// Count timestamps per period, newest period first.
pub fn count_by_period(timestamps: &[DateTime<Utc>], group: TimeGroup) -> Vec<LogCount> {
    let mut counts = std::collections::BTreeMap::new();
    for timestamp in timestamps {
        *counts.entry(group.truncate(timestamp.date_naive())).or_insert(0u64) += 1;
    }

    counts
        .into_iter()
        .rev()
        .map(|(period, count)| LogCount { period, count })
        .collect()
}

pub async fn grouped_logs(
    db: &DatabaseConnection,
    search: &LogSearch,
    group: TimeGroup,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<LogCount>> {
    let timestamps: Vec<DateTime<Utc>> = filtered(search)
        .select_only()
        .column(logs::Column::Timestamp)
        .into_tuple()
        .all(db)
        .await?;

    Ok(Page::from_vec(count_by_period(&timestamps, group), page_no, page_size))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn test_audit_layer_captures_audit_events_only() {
        let (layer, mut receiver) = AuditLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("not audited");
            tracing::warn!(
                target: AUDIT_TARGET,
                user = %"admin",
                is_staff = true,
                long_message = %"from: Paid, to: Shipped",
                "Staff {} changed the status of order #{}",
                "admin",
                7
            );
        });

        let entry = receiver.try_recv().unwrap();
        assert_eq!(entry.user, "admin");
        assert!(entry.is_staff);
        assert_eq!(entry.level, "warn");
        assert_eq!(entry.message, "Staff admin changed the status of order #7");
        assert_eq!(entry.long_message.as_deref(), Some("from: Paid, to: Shipped"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_count_by_period() {
        let at = |d: u32| Utc.with_ymd_and_hms(2026, 10, d, 9, 30, 0).unwrap();
        let counts = count_by_period(&[at(1), at(2), at(2), at(9)], TimeGroup::Week);

        assert_eq!(
            counts,
            vec![
                LogCount {
                    period: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
                    count: 1
                },
                LogCount {
                    period: NaiveDate::from_ymd_opt(2026, 9, 28).unwrap(),
                    count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_writer_stores_entries() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![logs::Model {
                id: 1,
                timestamp: Utc::now(),
                user: "jane".to_string(),
                level: "info".to_string(),
                message: "Customer jane logged in".to_string(),
                long_message: None,
                is_staff: false,
            }]])
            .into_connection();

        let (layer, receiver) = AuditLayer::channel();
        let handle = spawn_writer(db, receiver);

        layer
            .sender
            .send(NewLogEntry {
                user: "jane".to_string(),
                message: "Customer jane logged in".to_string(),
                ..Default::default()
            })
            .unwrap();
        drop(layer);

        handle.await.unwrap();
    }
}
