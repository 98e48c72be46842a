use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    audio::{jukebox::SkipOutcome, votes::VoteOutcome},
    bot::{DiscordJukebox, PartyBot},
    error::AudioError,
    ui::{embeds, messages::describe_request},
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &PartyBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    if guild_id != bot.guild_id() {
        return reply(ctx, &command, "❌ This bot only plays in its home server.").await;
    }

    let jukebox = PartyBot::jukebox(ctx).await?;

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, &jukebox, guild_id).await?,
        "playlist" => handle_playlist(ctx, &command, &jukebox, guild_id).await?,
        "skip" => handle_skip(ctx, &command, &jukebox, bot).await?,
        "queue" => handle_queue(ctx, &command, &jukebox).await?,
        "clear_queue" => handle_clear_queue(ctx, &command, &jukebox, bot).await?,
        _ => reply(ctx, &command, "❌ Comando no reconocido").await?,
    }

    Ok(())
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    jukebox: &DiscordJukebox,
    guild_id: GuildId,
) -> Result<()> {
    let url = string_option(command, "url")?;
    let duration = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "duration")
        .and_then(|opt| opt.value.as_i64())
        .map(|secs| secs.max(0) as u64);

    let Some(channel_id) = target_channel(ctx, command, guild_id) else {
        return reply(ctx, command, "❌ Join a voice channel or pick one with `channel`.").await;
    };

    // Defer la respuesta ya que puede tomar tiempo
    defer(ctx, command).await?;

    let content = match jukebox
        .submit_request(command.user.id, url, channel_id, duration)
        .await
    {
        Ok(request) => format!(
            "Added \"{}\" to the queue. Use **/queue** to view the queue.",
            describe_request(&request)
        ),
        Err(AudioError::Classification(e)) => format!("❌ {}", e),
        Err(e) => {
            error!("Error al encolar {}: {}", url, e);
            "❌ Something went wrong while queueing that request.".to_string()
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

async fn handle_playlist(
    ctx: &Context,
    command: &CommandInteraction,
    jukebox: &Arc<DiscordJukebox>,
    guild_id: GuildId,
) -> Result<()> {
    let url = string_option(command, "url")?;

    let Some(channel_id) = target_channel(ctx, command, guild_id) else {
        return reply(ctx, command, "❌ Join a voice channel or pick one with `channel`.").await;
    };

    jukebox.submit_collection(command.user.id, url.to_string(), channel_id);

    reply(
        ctx,
        command,
        "📋 Loading playlist. Its videos will be added to the queue as they resolve.",
    )
    .await
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    jukebox: &DiscordJukebox,
    bot: &PartyBot,
) -> Result<()> {
    let privileged = bot.is_privileged(command.member.as_deref());

    let content = match jukebox.request_skip(command.user.id, privileged).await {
        Ok(SkipOutcome::Forced { title }) => format!("Skipping \"{}\".", title),
        Ok(SkipOutcome::Voted { title, outcome }) => match outcome {
            VoteOutcome::QuorumReached { needed, .. } => format!(
                "Reached needed number of skip votes ({}) - skipping \"{}\".",
                needed, title
            ),
            VoteOutcome::Counted { .. } => format!("Voted to skip \"{}\".", title),
            VoteOutcome::AlreadyVoted => "You already submitted a vote for this request.".to_string(),
        },
        Err(AudioError::NothingPlaying) => "Queue is empty - nothing to skip.".to_string(),
        Err(e) => {
            error!("Error al saltar: {}", e);
            "❌ Something went wrong while skipping.".to_string()
        }
    };

    reply(ctx, command, &content).await
}

async fn handle_queue(ctx: &Context, command: &CommandInteraction, jukebox: &DiscordJukebox) -> Result<()> {
    let snapshot = jukebox.inspect_queue().await;
    let embed = embeds::create_queue_embed(&snapshot);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_clear_queue(
    ctx: &Context,
    command: &CommandInteraction,
    jukebox: &DiscordJukebox,
    bot: &PartyBot,
) -> Result<()> {
    if !bot.is_privileged(command.member.as_deref()) {
        return reply(ctx, command, "❌ Only admins can clear the queue.").await;
    }

    match jukebox.clear_queue().await {
        Ok(cleared) => {
            info!("🗑️ {} limpió la cola ({} requests)", command.user.name, cleared);
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content(format!("Queue cleared by <@{}>.", command.user.id)),
                    ),
                )
                .await?;
            Ok(())
        }
        Err(e) => {
            error!("Error al limpiar la cola: {}", e);
            reply(ctx, command, "❌ Something went wrong while clearing the queue.").await
        }
    }
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Result<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Opción `{}` no proporcionada", name))
}

/// The `channel` option when given, otherwise the caller's voice channel.
fn target_channel(ctx: &Context, command: &CommandInteraction, guild_id: GuildId) -> Option<ChannelId> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "channel")
        .and_then(|opt| opt.value.as_channel_id())
        .or_else(|| user_voice_channel(ctx, guild_id, command.user.id))
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

async fn defer(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
        )
        .await?;
    Ok(())
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
