use std::time::Duration;

/// Formats a duration the way the CLI reports elapsed time.
pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else if secs < 3600.0 {
        let minutes = (secs / 60.0).floor();
        format!("{minutes:.0}m {:.2}s", secs - minutes * 60.0)
    } else {
        let hours = (secs / 3600.0).floor();
        let minutes = ((secs - hours * 3600.0) / 60.0).floor();
        let seconds = secs - hours * 3600.0 - minutes * 60.0;
        format!("{hours:.0}h {minutes:.0}m {seconds:.2}s")
    }
}

/// Number of decimal digits needed to print `num`.
pub fn digit_count(mut num: u64) -> usize {
    let mut digits = 1;
    while num >= 10 {
        num /= 10;
        digits += 1;
    }
    digits
}
