use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

pub fn create_spinner(message: String) -> ProgressBar {
    // Spinners would corrupt JSON line output
    if get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style.tick_chars("⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋"));
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a spinner and print a success message with a checkmark
/// This clears the spinner line entirely and prints a clean message
pub fn finish_spinner_with_success(pb: ProgressBar, message: impl Into<String>) {
    pb.finish_and_clear();
    emit(Level::Success, "progress.done", &format!("✓ {}", message.into()), None);
}

/// Progress bar for long ffmpeg encodes, measured in milliseconds of media
pub fn create_encode_bar(total_seconds: f64, message: &str) -> ProgressBar {
    if get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new((total_seconds * 1000.0) as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
