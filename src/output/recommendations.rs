//! Usage recommendations derived from measured throughput and latency

/// One recommendation line
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// Which measurement the advice is about
    pub metric: &'static str,
    pub text: &'static str,
}

/// Advice for download, upload and latency, in that order
pub fn usage_recommendations(download: f64, upload: f64, ping: f64) -> Vec<Recommendation> {
    let download_text = if download >= 100.0 {
        "Excellent for 4K streaming and large downloads"
    } else if download >= 25.0 {
        "Good for HD streaming and video calls"
    } else {
        "Suitable for basic browsing and SD streaming"
    };

    let upload_text = if upload >= 50.0 {
        "Great for video conferencing and content creation"
    } else if upload >= 10.0 {
        "Adequate for video calls and file uploads"
    } else {
        "Limited upload capabilities"
    };

    let ping_text = if ping <= 20.0 {
        "Excellent for online gaming"
    } else if ping <= 50.0 {
        "Good for most online activities"
    } else {
        "May experience lag in real-time applications"
    };

    vec![
        Recommendation { metric: "Download", text: download_text },
        Recommendation { metric: "Upload", text: upload_text },
        Recommendation { metric: "Latency", text: ping_text },
    ]
}
