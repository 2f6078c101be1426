// File: src/services/notification_service.rs

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, warn};

use streamwatch_common::models::{StatusSnapshot, Subscription, TrackedAccount};
use streamwatch_common::traits::repository_traits::{
    NotificationSink, NotifyDestination, SubscriptionRepository,
};

/// Go-live message used when a subscription carries no custom template.
pub const DEFAULT_TEMPLATE: &str =
    "🔴 **{streamer}** is now live on {platform}!\n\n**{title}**\n{url}";

/// Turns one went-live transition into rendered messages for every active
/// subscriber of the account. Deliveries settle independently; a sink
/// failure for one channel is logged and the rest still go out.
pub struct NotificationService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            subscriptions,
            sink,
        }
    }

    pub async fn notify_went_live(&self, account: &TrackedAccount, snapshot: &StatusSnapshot) {
        let subs = match self
            .subscriptions
            .list_active_for_account(account.account_id)
            .await
        {
            Ok(subs) => subs,
            Err(e) => {
                error!("could not load subscriptions for {}: {e}", account.handle);
                return;
            }
        };
        if subs.is_empty() {
            debug!("no active subscriptions for {}", account.handle);
            return;
        }

        let sends = subs.iter().map(|sub| self.deliver(sub, account, snapshot));
        join_all(sends).await;
    }

    async fn deliver(&self, sub: &Subscription, account: &TrackedAccount, snapshot: &StatusSnapshot) {
        let message = render_message(sub, account, snapshot);
        let destination = NotifyDestination {
            guild_id: sub.guild_id.clone(),
            channel_id: sub.channel_id.clone(),
        };
        match self.sink.send(&destination, &message).await {
            Ok(()) => debug!(
                "sent go-live notice for {} to channel {}",
                account.display_name, destination.channel_id
            ),
            Err(e) => warn!(
                "could not deliver go-live notice to channel {}: {e}",
                destination.channel_id
            ),
        }
    }
}

/// Substitute the `{streamer}` `{platform}` `{title}` `{url}` placeholders
/// into the subscription's template (or the default), and prepend the
/// mention when one is configured.
pub fn render_message(
    sub: &Subscription,
    account: &TrackedAccount,
    snapshot: &StatusSnapshot,
) -> String {
    let template = sub.message_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let url = snapshot
        .stream_url
        .clone()
        .unwrap_or_else(|| account.platform.channel_url(&account.handle));

    let body = template
        .replace("{streamer}", &account.display_name)
        .replace("{platform}", account.platform.display_name())
        .replace("{title}", snapshot.title.as_deref().unwrap_or("No title"))
        .replace("{url}", &url);

    match &sub.mention_target {
        Some(role) => format!("<@&{role}>\n{body}"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use streamwatch_common::models::Platform;
    use uuid::Uuid;

    fn subscription(template: Option<&str>, mention: Option<&str>) -> Subscription {
        let now = Utc::now();
        Subscription {
            subscription_id: Uuid::new_v4(),
            guild_id: "g1".into(),
            channel_id: "c1".into(),
            account_id: Uuid::new_v4(),
            message_template: template.map(String::from),
            mention_target: mention.map(String::from),
            is_active: true,
            created_by: "op".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot_with(title: &str, url: &str) -> StatusSnapshot {
        let mut snap = StatusSnapshot::live(Platform::Kick);
        snap.title = Some(title.to_string());
        snap.stream_url = Some(url.to_string());
        snap
    }

    #[test]
    fn custom_template_resolves_every_placeholder() {
        let mut account = TrackedAccount::new(Platform::Kick, "ana", "ana", "Ana");
        account.display_name = "Ana".into();
        let sub = subscription(Some("{streamer} live on {platform}: {title} {url}"), None);
        let snap = snapshot_with("Chatting", "https://kick.com/ana");

        let rendered = render_message(&sub, &account, &snap);
        assert_eq!(rendered, "Ana live on Kick: Chatting https://kick.com/ana");
        assert!(!rendered.contains('{'), "unresolved placeholder in {rendered}");
    }

    #[test]
    fn default_template_and_mention_prefix() {
        let account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
        let sub = subscription(None, Some("4567"));
        let snap = snapshot_with("Ranked", "https://twitch.tv/ana");

        let rendered = render_message(&sub, &account, &snap);
        assert!(rendered.starts_with("<@&4567>\n"));
        assert!(rendered.contains("**Ana** is now live on Twitch!"));
        assert!(rendered.contains("**Ranked**"));
        assert!(rendered.ends_with("https://twitch.tv/ana"));
    }

    #[test]
    fn missing_title_falls_back_without_breaking_render() {
        let account = TrackedAccount::new(Platform::Kick, "ana", "ana", "Ana");
        let sub = subscription(None, None);
        let mut snap = StatusSnapshot::live(Platform::Kick);
        snap.stream_url = Some("https://kick.com/ana".into());

        let rendered = render_message(&sub, &account, &snap);
        assert!(rendered.contains("**No title**"));
    }
}
