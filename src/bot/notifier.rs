use anyhow::Result;
use async_trait::async_trait;
use serenity::{builder::EditMessage, http::Http, model::id::ChannelId};
use std::sync::Arc;

use crate::audio::{store::StatusRef, transport::Notifier};

/// Posts the status line and notices to the configured bot channel.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn post_status(&self, content: &str) -> Result<StatusRef> {
        let message = self.channel_id.say(&*self.http, content).await?;
        Ok(StatusRef {
            channel_id: message.channel_id,
            message_id: message.id,
        })
    }

    async fn edit_status(&self, status: StatusRef, content: &str) -> Result<()> {
        status
            .channel_id
            .edit_message(
                &*self.http,
                status.message_id,
                EditMessage::new().content(content),
            )
            .await?;
        Ok(())
    }

    async fn post_notice(&self, content: &str) -> Result<()> {
        self.channel_id.say(&*self.http, content).await?;
        Ok(())
    }
}
