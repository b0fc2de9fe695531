use serde::Serialize;

/// Upload class, split at the Shorts boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VideoKind {
    Short,
    Longform,
}

impl VideoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "Short",
            Self::Longform => "Longform",
        }
    }
}

const SHORTS_MAX_SECONDS: u64 = 60;

/// Classifies a runtime in seconds.
pub fn classify(seconds: u64) -> VideoKind {
    if seconds <= SHORTS_MAX_SECONDS {
        VideoKind::Short
    } else {
        VideoKind::Longform
    }
}

/// Parses the ISO-8601 durations the Data API emits (`PT1H2M3S`, `P1DT2H`).
///
/// Returns `None` for anything that is not a day/time duration; the API
/// never reports year or month components for video runtimes.
pub fn parse_iso8601_seconds(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let (day_part, time_part) = match rest.split_once('T') {
        Some((days, time)) => (days, Some(time)),
        None => (rest, None),
    };

    let mut seconds = 0u64;
    if !day_part.is_empty() {
        let days = day_part.strip_suffix('D')?.parse::<u64>().ok()?;
        seconds += days * 86_400;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return None;
        }
        let mut number = String::new();
        for ch in time_part.chars() {
            if ch.is_ascii_digit() {
                number.push(ch);
                continue;
            }
            let amount = number.parse::<u64>().ok()?;
            number.clear();
            match ch {
                'H' => seconds += amount * 3_600,
                'M' => seconds += amount * 60,
                'S' => seconds += amount,
                _ => return None,
            }
        }
        if !number.is_empty() {
            return None;
        }
    } else if day_part.is_empty() {
        return None;
    }

    Some(seconds)
}
