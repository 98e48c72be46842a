use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, channel::ChannelType, id::GuildId},
    prelude::Context,
};

/// Registra los comandos de la guild
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    let commands = vec![
        play_command(),
        playlist_command(),
        skip_command(),
        queue_command(),
        clear_queue_command(),
    ];

    guild_id.set_commands(&ctx.http, commands).await?;

    Ok(())
}

fn channel_option() -> CreateCommandOption {
    CreateCommandOption::new(
        CommandOptionType::Channel,
        "channel",
        "Voice channel to play in (defaults to the one you are in)",
    )
    .channel_types(vec![ChannelType::Voice])
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Queue an audio link")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "url",
                "YouTube link or direct link to an audio file",
            )
            .required(true),
        )
        .add_option(channel_option())
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "duration",
                "Stop after this many seconds",
            )
            .min_int_value(1),
        )
}

fn playlist_command() -> CreateCommand {
    CreateCommand::new("playlist")
        .description("Queue every video of a YouTube playlist")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "url", "Playlist link")
                .required(true),
        )
        .add_option(channel_option())
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current request, or vote to skip it")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the current request and the queue")
}

fn clear_queue_command() -> CreateCommand {
    CreateCommand::new("clear_queue").description("Clear the queue and stop the current request")
}
