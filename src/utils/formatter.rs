use crate::Result;
use crate::http::Response;
use colored::*;

pub enum ResponseFormat {
    Compact,
    Verbose,
    /// 原样输出 Response 结构（JSON）
    Json,
}

pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn format(&self, response: &Response) -> Result<String> {
        match self.format {
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(response)?),
            ResponseFormat::Compact => Ok(self.format_text(response, false)),
            ResponseFormat::Verbose => Ok(self.format_text(response, true)),
        }
    }

    fn paint(&self, text: String, style: fn(ColoredString) -> ColoredString, base: Color) -> String {
        if self.color {
            style(text.color(base)).to_string()
        } else {
            text
        }
    }

    fn format_text(&self, response: &Response, verbose: bool) -> String {
        let mut output = Vec::new();

        if let Some(error) = &response.error {
            output.push(self.paint(format!("Error: {}", error.message), |s| s.bold(), Color::Red));
            output.push(self.paint(format!("Time: {}ms", response.duration_ms), |s| s, Color::Cyan));
            return output.join("\n");
        }

        let status_line = format!(
            "HTTP {} {}",
            response.status.unwrap_or_default(),
            response.status_text.as_deref().unwrap_or_default()
        );
        let status_color = status_color(response);
        output.push(self.paint(status_line.trim_end().to_string(), |s| s.bold(), status_color));
        output.push(self.paint(format!("Time: {}ms", response.duration_ms), |s| s, Color::Cyan));

        if verbose {
            output.push(String::new());
            output.push(self.paint("Headers:".to_string(), |s| s.bold(), Color::Blue));
            for header in &response.headers {
                output.push(self.paint(format!("   {}: {}", header.key, header.value), |s| s, Color::Blue));
            }
        }

        let body = response.text();
        if !body.is_empty() {
            output.push(String::new());
            if verbose {
                output.push(self.paint("Body:".to_string(), |s| s.bold(), Color::Blue));
            }
            output.push(body.to_string());
        }

        output.join("\n")
    }
}

/// 1xx 蓝、2xx 绿、3xx 青、4xx 黄、其余红
fn status_color(response: &Response) -> Color {
    match response.status() {
        Some(s) if s.is_informational() => Color::Blue,
        Some(s) if s.is_success() => Color::Green,
        Some(s) if s.is_redirect() => Color::Cyan,
        Some(s) if s.is_client_error() => Color::Yellow,
        _ => Color::Red,
    }
}
