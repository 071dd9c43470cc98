//! Request inputs: weather, user profile and the generation request itself.
//!
//! Every field is optional with a permissive default; a request built from
//! nothing but an occasion string is valid.

use serde::{Deserialize, Serialize};

use crate::item::{normalize_tag, normalize_tags};

/// Coarse weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Wind,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Parse free text ("Light rain", "SUNNY", "snow showers").
    pub fn parse(raw: &str) -> Self {
        let text = normalize_tag(raw);
        if text.contains("snow") || text.contains("sleet") || text.contains("blizzard") {
            WeatherCondition::Snow
        } else if text.contains("rain")
            || text.contains("drizzle")
            || text.contains("shower")
            || text.contains("storm")
        {
            WeatherCondition::Rain
        } else if text.contains("wind") || text.contains("gust") {
            WeatherCondition::Wind
        } else if text.contains("cloud") || text.contains("overcast") || text.contains("fog") {
            WeatherCondition::Cloudy
        } else if text.contains("sun") || text.contains("clear") || text.contains("fair") {
            WeatherCondition::Clear
        } else {
            WeatherCondition::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Wind => "wind",
            WeatherCondition::Unknown => "unknown",
        }
    }

    /// Conditions where water-sensitive materials should be avoided.
    pub fn is_wet(&self) -> bool {
        matches!(self, WeatherCondition::Rain | WeatherCondition::Snow)
    }
}

/// Current weather. Temperature is in degrees Fahrenheit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Weather {
    #[serde(default)]
    pub temperature_f: Option<f64>,
    #[serde(default)]
    pub condition: WeatherCondition,
}

impl Weather {
    pub fn new(temperature_f: f64, condition: &str) -> Self {
        Self {
            temperature_f: Some(temperature_f),
            condition: WeatherCondition::parse(condition),
        }
    }

    /// No weather information; weather rules become permissive.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Build from Celsius.
    pub fn from_celsius(temperature_c: f64, condition: &str) -> Self {
        Self::new(temperature_c * 9.0 / 5.0 + 32.0, condition)
    }
}

/// Physical and stylistic profile of the requesting user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub skin_tone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Styles the user says they like
    #[serde(default)]
    pub style_preferences: Vec<String>,
    /// Styles the user wants to avoid
    #[serde(default)]
    pub disliked_styles: Vec<String>,
    /// Colors the user wants to avoid
    #[serde(default)]
    pub disliked_colors: Vec<String>,
}

impl UserProfile {
    pub fn with_body_type(mut self, body_type: &str) -> Self {
        self.body_type = Some(normalize_tag(body_type));
        self
    }

    pub fn with_skin_tone(mut self, skin_tone: &str) -> Self {
        self.skin_tone = Some(normalize_tag(skin_tone));
        self
    }

    pub fn with_style_preferences(mut self, styles: &[&str]) -> Self {
        self.style_preferences = normalize_tags(styles);
        self
    }

    pub fn with_disliked_styles(mut self, styles: &[&str]) -> Self {
        self.disliked_styles = normalize_tags(styles);
        self
    }

    pub fn with_disliked_colors(mut self, colors: &[&str]) -> Self {
        self.disliked_colors = normalize_tags(colors);
        self
    }

    /// True if the profile states no preferences at all.
    pub fn is_empty(&self) -> bool {
        self.body_type.is_none()
            && self.style_preferences.is_empty()
            && self.disliked_styles.is_empty()
            && self.disliked_colors.is_empty()
    }
}

/// A single outfit generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutfitRequest {
    #[serde(default)]
    pub occasion: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub profile: UserProfile,
}

impl OutfitRequest {
    pub fn new(occasion: &str, style: &str) -> Self {
        Self {
            occasion: normalize_tag(occasion),
            style: normalize_tag(style),
            ..Default::default()
        }
    }

    pub fn with_mood(mut self, mood: &str) -> Self {
        let mood = normalize_tag(mood);
        self.mood = (!mood.is_empty()).then_some(mood);
        self
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = profile;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_condition_parse() {
        assert_eq!(WeatherCondition::parse("Light Rain"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::parse("snow showers"), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::parse("SUNNY"), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::parse("partly cloudy"), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::parse("???"), WeatherCondition::Unknown);
    }

    #[test]
    fn test_weather_from_celsius() {
        let weather = Weather::from_celsius(20.0, "clear");
        assert!((weather.temperature_f.unwrap() - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_request_defaults_are_permissive() {
        let request: OutfitRequest = serde_json::from_str("{}").unwrap();
        assert!(request.occasion.is_empty());
        assert_eq!(request.weather, Weather::unknown());
        assert!(request.profile.is_empty());
    }

    #[test]
    fn test_request_builder_normalizes() {
        let request = OutfitRequest::new("Business Formal", "Classic").with_mood("  ");
        assert_eq!(request.occasion, "business formal");
        assert_eq!(request.style, "classic");
        assert!(request.mood.is_none());
    }
}
