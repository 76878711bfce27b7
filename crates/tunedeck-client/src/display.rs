//! String formatting for values the rendering layer shows verbatim.

/// `MM:SS`, or `H:MM:SS` from one hour up. Minutes and seconds are always
/// two digits; hours are not padded.
pub fn seconds_to_time(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Fractional seconds are truncated; negative or non-finite input shows as
/// zero.
pub fn duration_to_time(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return seconds_to_time(0);
    }
    seconds_to_time(secs.floor() as u64)
}

/// Sample rate in Hz as a kHz label: `44100` → `"44.1 kHz"`, `48000` →
/// `"48 kHz"`.
pub fn rate_to_khz(rate_hz: u32) -> String {
    let khz = rate_hz as f64 / 1000.0;
    let text = format!("{:.1}", khz);
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{} kHz", text)
}

/// Wall time of a position, given the track's seconds per position unit.
pub fn position_to_time(position: i64, sec_per_sample: Option<f64>) -> String {
    match sec_per_sample {
        Some(scale) if position > 0 => duration_to_time(position as f64 * scale),
        _ => seconds_to_time(0),
    }
}
