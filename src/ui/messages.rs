//! Plain-text rendering of requests, the status line and the queue.

use std::time::Duration;

use crate::audio::request::AudioRequest;

/// `hh:mm:ss`, zero padded.
pub fn timecode(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Compact human duration such as `8m 1s`.
pub fn readable_duration(seconds: u64) -> String {
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}

/// Title plus optional start-offset and duration annotations.
pub fn describe_request(request: &AudioRequest) -> String {
    let mut notes = Vec::new();
    if request.start_offset_secs > 0 {
        notes.push(format!("starting at {}", timecode(request.start_offset_secs)));
    }
    if let Some(cap) = request.duration_cap_secs {
        notes.push(format!("for {}", readable_duration(cap)));
    }

    if notes.is_empty() {
        request.title.clone()
    } else {
        format!("{} _({})_", request.title, notes.join(", "))
    }
}

/// Status line for the current request, with vote progress once someone
/// has voted. Struck through when the request was skipped.
pub fn now_playing(request: &AudioRequest, needed: Option<u32>, skipped: bool) -> String {
    let mut line = format!("Now playing \"{}\".", describe_request(request));

    let votes = request.skip_votes();
    if votes > 0 {
        let needed_text = needed.map_or_else(|| "?".to_string(), |n| n.to_string());
        line.push_str(&format!(" [Skip? **{}/{}**]", votes, needed_text));
    }

    let quorum_reached = needed.is_some_and(|n| votes > 0 && votes >= n as usize);
    if skipped || quorum_reached {
        line = format!("~~{}~~ SKIPPED", line);
    }

    line
}

/// "Currently playing" line followed by the numbered pending list.
pub fn queue_listing(current: Option<&AudioRequest>, pending: &[AudioRequest]) -> String {
    let Some(current) = current else {
        if pending.is_empty() {
            return "Queue is empty.".to_string();
        }
        return numbered(pending, "**In Queue:**\n".to_string());
    };

    let header = format!("**Currently playing**: {}\n\n", describe_request(current));
    if pending.is_empty() {
        format!("{}*(Queue is empty.)*", header)
    } else {
        numbered(pending, format!("{}**In Queue:**\n", header))
    }
}

fn numbered(pending: &[AudioRequest], mut out: String) -> String {
    for (place, request) in pending.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", place + 1, describe_request(request)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::request;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;

    #[test]
    fn timecodes_are_padded() {
        assert_eq!(timecode(0), "00:00:00");
        assert_eq!(timecode(13), "00:00:13");
        assert_eq!(timecode(120), "00:02:00");
        assert_eq!(timecode(1323), "00:22:03");
        assert_eq!(timecode(48212), "13:23:32");
    }

    #[test]
    fn readable_durations() {
        assert_eq!(readable_duration(0), "0s");
        assert_eq!(readable_duration(58), "58s");
        assert_eq!(readable_duration(481), "8m 1s");
        assert_eq!(readable_duration(1033), "17m 13s");
    }

    #[test]
    fn request_with_offset_and_duration_has_both_annotations() {
        let mut r = request("Song", 1);
        r.start_offset_secs = 90;
        r.duration_cap_secs = Some(30);

        assert_eq!(
            describe_request(&r),
            "Song _(starting at 00:01:30, for 30s)_"
        );
    }

    #[test]
    fn plain_request_has_no_annotations() {
        let mut r = request("Song", 1);
        r.duration_cap_secs = None;
        assert_eq!(describe_request(&r), "Song");
    }

    #[test]
    fn status_line_shows_vote_progress_and_skip() {
        let mut r = request("Song", 1);
        r.duration_cap_secs = None;
        assert_eq!(now_playing(&r, Some(2), false), "Now playing \"Song\".");

        r.skip_voters.insert(UserId::new(5));
        assert_eq!(
            now_playing(&r, Some(2), false),
            "Now playing \"Song\". [Skip? **1/2**]"
        );

        r.skip_voters.insert(UserId::new(6));
        assert_eq!(
            now_playing(&r, Some(2), false),
            "~~Now playing \"Song\". [Skip? **2/2**]~~ SKIPPED"
        );
    }

    #[test]
    fn forced_skip_strikes_the_line() {
        let mut r = request("Song", 1);
        r.duration_cap_secs = None;
        assert_eq!(
            now_playing(&r, Some(3), true),
            "~~Now playing \"Song\".~~ SKIPPED"
        );
    }

    #[test]
    fn queue_listing_numbers_pending_requests() {
        let mut current = request("Now", 1);
        current.duration_cap_secs = None;
        let mut a = request("A", 1);
        a.duration_cap_secs = None;
        let mut b = request("B", 1);
        b.duration_cap_secs = Some(481);

        assert_eq!(
            queue_listing(Some(&current), &[a, b]),
            "**Currently playing**: Now\n\n**In Queue:**\n1. A\n2. B _(for 8m 1s)_\n"
        );
        assert_eq!(
            queue_listing(Some(&current), &[]),
            "**Currently playing**: Now\n\n*(Queue is empty.)*"
        );
        assert_eq!(queue_listing(None, &[]), "Queue is empty.");
    }
}
