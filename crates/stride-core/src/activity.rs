//! Activity Aggregator: fans out over the five activity domains, folds the
//! results into one deduplicated, time-ordered feed, and synthesizes
//! inactivity alerts for active clients who have gone quiet.
//!
//! A pass is all-or-nothing. If any single domain fetch fails, the whole
//! pass fails and the feed for that cycle is empty - a partial feed would
//! read as a complete one and hide the missing domain. The next scheduled
//! pass retries from scratch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::unix_now;
use crate::config::CoreConfig;
use crate::datastore::DataStore;
use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::models::{ActivityDomain, ActivityEvent, Client, ClientStatus, NavTarget};
use crate::poll::PollHandle;

/// Most recent qualifying event timestamp per client, rebuilt on every
/// pass. Calendar entries never feed it - an upcoming appointment is not
/// evidence the client did anything.
type ClientActivityCursor = HashMap<String, u64>;

pub struct ActivityAggregator {
    store: Arc<dyn DataStore>,
    config: CoreConfig,
}

impl ActivityAggregator {
    pub fn new(store: Arc<dyn DataStore>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    fn client_name<'a>(roster: &'a HashMap<String, Client>, client_id: &'a str) -> &'a str {
        roster
            .get(client_id)
            .map(|c| c.display_name.as_str())
            .unwrap_or(client_id)
    }

    /// Run one aggregation pass. `now` is unix seconds; the recent window is
    /// `[now - lookback, now]` and the calendar window `[now, now + lookahead]`.
    pub async fn refresh(
        &self,
        workspace_id: &str,
        now: u64,
    ) -> Result<Vec<ActivityEvent>, CoreError> {
        let since = now.saturating_sub(self.config.lookback.as_secs());
        let until = now + self.config.lookahead.as_secs();
        let cap = self.config.per_domain_cap;

        let roster: HashMap<String, Client> = self
            .store
            .clients_for_workspace(workspace_id)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        // Fan-out over the five domains; the first error aborts the pass.
        let (messages, workouts, habits, checkins, calendar) = futures::try_join!(
            self.store.recent_inbound_messages(workspace_id, since, cap),
            self.store.recent_workouts(workspace_id, since, cap),
            self.store.recent_habit_logs(workspace_id, since, cap),
            self.store.recent_checkins(workspace_id, since, cap),
            self.store
                .upcoming_calendar_events(workspace_id, now, until, cap),
        )?;

        let mut cursor = ClientActivityCursor::new();
        let mut track = |client_id: &str, at: u64| {
            let entry = cursor.entry(client_id.to_string()).or_insert(0);
            *entry = (*entry).max(at);
        };

        let mut candidates: Vec<ActivityEvent> = Vec::new();

        for message in &messages {
            track(&message.sender_id, message.created_at);
            let name = Self::client_name(&roster, &message.sender_id);
            candidates.push(ActivityEvent {
                id: ActivityDomain::Message.event_id(&message.id),
                domain: ActivityDomain::Message,
                title: format!("New message from {name}"),
                description: message.body.chars().take(80).collect(),
                occurred_at: message.created_at,
                target: NavTarget::Conversation {
                    conversation_id: message.conversation_id.clone(),
                },
            });
        }

        for workout in &workouts {
            track(&workout.client_id, workout.completed_at);
            let name = Self::client_name(&roster, &workout.client_id);
            candidates.push(ActivityEvent {
                id: ActivityDomain::Workout.event_id(&workout.id),
                domain: ActivityDomain::Workout,
                title: format!("{name} completed a workout"),
                description: workout.title.clone(),
                occurred_at: workout.completed_at,
                target: NavTarget::ClientProfile {
                    client_id: workout.client_id.clone(),
                },
            });
        }

        for habit in &habits {
            track(&habit.client_id, habit.logged_at);
            let name = Self::client_name(&roster, &habit.client_id);
            candidates.push(ActivityEvent {
                id: ActivityDomain::Habit.event_id(&habit.id),
                domain: ActivityDomain::Habit,
                title: format!("{name} logged a habit"),
                description: habit.habit_name.clone(),
                occurred_at: habit.logged_at,
                target: NavTarget::ClientProfile {
                    client_id: habit.client_id.clone(),
                },
            });
        }

        for checkin in &checkins {
            track(&checkin.client_id, checkin.submitted_at);
            let name = Self::client_name(&roster, &checkin.client_id);
            candidates.push(ActivityEvent {
                id: ActivityDomain::CheckIn.event_id(&checkin.id),
                domain: ActivityDomain::CheckIn,
                title: format!("{name} submitted a check-in"),
                description: checkin.title.clone(),
                occurred_at: checkin.submitted_at,
                target: NavTarget::ClientProfile {
                    client_id: checkin.client_id.clone(),
                },
            });
        }

        for event in &calendar {
            // Deliberately not tracked in the cursor.
            candidates.push(ActivityEvent {
                id: ActivityDomain::Calendar.event_id(&event.id),
                domain: ActivityDomain::Calendar,
                title: format!("Upcoming: {}", event.title),
                description: event
                    .client_id
                    .as_deref()
                    .map(|id| Self::client_name(&roster, id).to_string())
                    .unwrap_or_default(),
                occurred_at: event.starts_at,
                target: NavTarget::Calendar {
                    event_id: event.id.clone(),
                },
            });
        }

        // One alert per active client with nothing inside the window,
        // anchored at the window edge so it sorts behind real recent events.
        for client in roster.values() {
            if client.status != ClientStatus::Active {
                continue;
            }
            let latest = cursor.get(&client.id).copied();
            if latest.map_or(true, |at| at < since) {
                candidates.push(ActivityEvent {
                    id: ActivityDomain::Inactivity.event_id(&client.id),
                    domain: ActivityDomain::Inactivity,
                    title: format!("{} has been inactive", client.display_name),
                    description: "No messages, workouts, habits or check-ins recently".to_string(),
                    occurred_at: since,
                    target: NavTarget::ClientProfile {
                        client_id: client.id.clone(),
                    },
                });
            }
        }

        // Dedupe by id, last write wins; prefixed ids make cross-domain
        // collisions impossible, so this only collapses true duplicates.
        let mut by_id: HashMap<String, ActivityEvent> = HashMap::with_capacity(candidates.len());
        for event in candidates {
            by_id.insert(event.id.clone(), event);
        }

        let mut feed: Vec<ActivityEvent> = by_id.into_values().collect();
        feed.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        feed.truncate(self.config.max_feed_len);
        Ok(feed)
    }
}

/// Holder the embedding layer renders from. A failed pass empties the feed
/// for that cycle instead of showing four domains as if they were five.
pub struct ActivityFeed {
    aggregator: ActivityAggregator,
    refresh_interval: Duration,
    items: Mutex<Vec<ActivityEvent>>,
    events: EventSink,
}

impl ActivityFeed {
    pub fn new(store: Arc<dyn DataStore>, config: CoreConfig, events: EventSink) -> Self {
        let refresh_interval = config.feed_refresh;
        Self {
            aggregator: ActivityAggregator::new(store, config),
            refresh_interval,
            items: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn items(&self) -> Vec<ActivityEvent> {
        self.items.lock().clone()
    }

    /// Run one pass and store its outcome.
    pub async fn refresh_now(&self, workspace_id: &str, now: u64) {
        match self.aggregator.refresh(workspace_id, now).await {
            Ok(feed) => {
                *self.items.lock() = feed;
            }
            Err(err) => {
                tracing::warn!(workspace_id, error = %err, "aggregation pass failed");
                self.items.lock().clear();
            }
        }
        self.events.emit(CoreEvent::FeedRefreshed);
    }

    /// Rebuild on the feed's own cadence, independent of the thread
    /// store's faster cycle. Scoped to the workspace view via the handle.
    pub fn start_polling(self: &Arc<Self>, workspace_id: String) -> PollHandle {
        let feed = Arc::clone(self);
        PollHandle::spawn("activity_feed", self.refresh_interval, move || {
            let feed = Arc::clone(&feed);
            let workspace_id = workspace_id.clone();
            async move {
                feed.refresh_now(&workspace_id, unix_now()).await;
                Ok(())
            }
        })
    }
}
