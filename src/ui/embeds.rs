use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use super::messages::queue_listing;
use crate::audio::jukebox::QueueSnapshot;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Party Queue";

/// Discord rejects embed descriptions above 4096 characters.
const DESCRIPTION_LIMIT: usize = 4096;

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(snapshot: &QueueSnapshot) -> CreateEmbed {
    let listing = queue_listing(snapshot.current.as_ref(), &snapshot.pending);
    let color = if snapshot.current.is_some() || !snapshot.pending.is_empty() {
        colors::MUSIC_PURPLE
    } else {
        colors::NEUTRAL_GRAY
    };

    CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .description(truncate(&listing, DESCRIPTION_LIMIT))
        .color(color)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(format!(
            "{} • {} en cola",
            STANDARD_FOOTER,
            snapshot.pending.len()
        )))
}

/// Cuts `text` to at most `limit` characters, marking the cut with `…`.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    // Prefer cutting at a line break so no entry is shown half rendered.
    let head: String = text.chars().take(limit.saturating_sub(1)).collect();
    match head.rfind('\n') {
        Some(end) => format!("{}\n…", &head[..end]),
        None => format!("{}…", head),
    }
}
