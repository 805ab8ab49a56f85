//! Assistant reply text for image questions

/// Render an elapsed time the way the chat shows it, e.g. `2.4s`
pub fn format_response_time(millis: u64) -> String {
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

pub fn format_image_reply(description: &str, response_time_ms: u64) -> String {
    format!(
        "📸 **Image Analysis Result:**\n\n{}\n\n---\n\n*Analysis completed in {}*",
        description,
        format_response_time(response_time_ms)
    )
}
