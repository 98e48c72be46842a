//! # Bot Module
//!
//! Discord side of the party queue.
//!
//! This module contains:
//! - Slash command registration and dispatch
//! - Track event handlers for songbird
//! - The channel notifier that posts and edits the status line
//!
//! [`PartyBot`] implements Serenity's [`EventHandler`]. The [`Jukebox`] it
//! drives lives in the client's type map under [`JukeboxKey`], inserted by
//! `main` once the voice transport has been built.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Member, Permissions, Ready, RoleId},
    async_trait,
    prelude::TypeMapKey,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod notifier;

use crate::{
    audio::{jukebox::Jukebox, player::SongbirdTransport},
    config::Config,
};

pub type DiscordJukebox = Jukebox<SongbirdTransport>;

pub struct JukeboxKey;

impl TypeMapKey for JukeboxKey {
    type Value = Arc<DiscordJukebox>;
}

/// Main Discord event handler.
pub struct PartyBot {
    config: Arc<Config>,
}

impl PartyBot {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        GuildId::new(self.config.guild_id)
    }

    pub async fn jukebox(ctx: &Context) -> Result<Arc<DiscordJukebox>> {
        ctx.data
            .read()
            .await
            .get::<JukeboxKey>()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Jukebox no inicializado"))
    }

    /// Administrators and holders of the configured admin role.
    pub fn is_privileged(&self, member: Option<&Member>) -> bool {
        member.is_some_and(|m| self.grants_privilege(m.permissions, &m.roles))
    }

    fn grants_privilege(&self, permissions: Option<Permissions>, roles: &[RoleId]) -> bool {
        let admin = permissions.is_some_and(|p| p.contains(Permissions::ADMINISTRATOR));
        let has_role = self
            .config
            .admin_role_id
            .is_some_and(|role| roles.contains(&RoleId::new(role)));

        admin || has_role
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        let guild_id = self.guild_id();
        if !ctx.cache.guilds().contains(&guild_id) {
            warn!("⚠️ El bot no está en la guild configurada: {}", guild_id);
            return Ok(());
        }

        commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
            error!("❌ Error registrando comandos de guild: {:?}", e);
            anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
        })?;
        info!("✅ Comandos de guild registrados para: {}", guild_id);

        Ok(())
    }
}

#[async_trait]
impl EventHandler for PartyBot {
    /// Registers commands and resumes a queue restored from disk.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        match Self::jukebox(&ctx).await {
            Ok(jukebox) => {
                if jukebox.resume().await {
                    info!("▶️ Reproducción reanudada tras reinicio");
                }
            }
            Err(e) => error!("Error al reanudar la cola: {:?}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(admin_role_id: Option<u64>) -> PartyBot {
        PartyBot::new(Config {
            admin_role_id,
            ..Config::default()
        })
    }

    fn roles(ids: &[u64]) -> Vec<RoleId> {
        ids.iter().copied().map(RoleId::new).collect()
    }

    #[test]
    fn administrators_are_privileged() {
        let bot = bot(None);
        assert!(bot.grants_privilege(Some(Permissions::ADMINISTRATOR), &[]));
        assert!(!bot.grants_privilege(Some(Permissions::SEND_MESSAGES), &[]));
        assert!(!bot.grants_privilege(None, &[]));
        assert!(!bot.is_privileged(None));
    }

    #[test]
    fn admin_role_grants_privilege() {
        let bot = bot(Some(77));
        assert!(bot.grants_privilege(Some(Permissions::empty()), &roles(&[5, 77])));
        assert!(!bot.grants_privilege(Some(Permissions::empty()), &roles(&[5])));
    }
}
