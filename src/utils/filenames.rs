use chrono::Utc;

/// Replace anything outside `[A-Za-z0-9._-]` so the name is safe in a
/// `Content-Disposition` header and on every filesystem
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `{reportType}-report-{unixMillis}.pdf`
pub fn bulk_report(report_type: &str, millis: i64) -> String {
    format!("{}-report-{millis}.pdf", sanitize(report_type))
}

/// `tracking-{productId}.pdf`
pub fn tracking_report(product_id: &str) -> String {
    format!("tracking-{}.pdf", sanitize(product_id))
}

/// `QR_Code_{unixMillis}.png`
pub fn qr_png(millis: i64) -> String {
    format!("QR_Code_{millis}.png")
}

/// `qr-{productId}.png`
pub fn product_qr_png(product_id: &str) -> String {
    format!("qr-{}.png", sanitize(product_id))
}

/// `{title}_QR.svg`
pub fn qr_svg(title: &str) -> String {
    format!("{}_QR.svg", sanitize(title))
}

/// `attachment; filename="..."` value for downloads
pub fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}
