use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub jd_text: String,
    /// Candidate background: experience summary, notable projects, etc.
    pub background: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub letter: String,
}

#[derive(Debug, Deserialize)]
pub struct CvOptimizeRequest {
    pub cv_text: String,
    pub jd_text: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CvOptimizeResponse {
    pub suggestions: String,
}
