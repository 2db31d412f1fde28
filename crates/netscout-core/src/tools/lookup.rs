use super::WebToolkit;
use crate::envelope::{Envelope, Failure};
use crate::fetcher::RequestProfile;
use crate::text::take_chars;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

// Wikipedia REST summary.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiSummary {
    title: String,
    description: String,
    extract: String,
    content_urls: Option<WikiContentUrls>,
    thumbnail: Option<WikiThumbnail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiContentUrls {
    desktop: Option<WikiPageLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiPageLink {
    page: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiThumbnail {
    source: String,
}

/// `[query, titles, descriptions, urls]`
type OpenSearch = (Value, Vec<String>, Value, Vec<String>);

#[derive(Debug, Serialize)]
struct WikipediaOutput {
    title: String,
    description: String,
    extract: String,
    url: String,
    thumbnail: String,
}

#[derive(Debug, Serialize)]
struct WikipediaMiss<'a> {
    query: &'a str,
    message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
struct Suggestion {
    title: String,
    url: String,
}

enum WikiOutcome {
    Found(WikipediaOutput),
    Suggestions(Vec<Suggestion>),
}

// wttr.in `format=j1`.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WttrReport {
    current_condition: Vec<WttrCurrent>,
    nearest_area: Vec<WttrArea>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WttrCurrent {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "temp_F")]
    temp_f: String,
    #[serde(rename = "FeelsLikeC")]
    feels_like_c: String,
    #[serde(rename = "FeelsLikeF")]
    feels_like_f: String,
    #[serde(rename = "weatherDesc")]
    weather_desc: Vec<WttrValue>,
    humidity: String,
    #[serde(rename = "windspeedKmph")]
    windspeed_kmph: String,
    #[serde(rename = "windspeedMiles")]
    windspeed_miles: String,
    #[serde(rename = "winddir16Point")]
    winddir_16_point: String,
    #[serde(rename = "uvIndex")]
    uv_index: String,
    visibility: String,
    pressure: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WttrArea {
    #[serde(rename = "areaName")]
    area_name: Vec<WttrValue>,
    region: Vec<WttrValue>,
    country: Vec<WttrValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WttrValue {
    value: String,
}

fn first_value(values: &[WttrValue]) -> Option<String> {
    values.first().map(|v| v.value.clone())
}

#[derive(Debug, Serialize)]
struct WeatherOutput {
    location: WeatherLocation,
    current: CurrentWeather,
}

#[derive(Debug, Serialize)]
struct WeatherLocation {
    name: String,
    region: String,
    country: String,
}

#[derive(Debug, Serialize)]
struct CurrentWeather {
    temperature_c: String,
    temperature_f: String,
    feels_like_c: String,
    feels_like_f: String,
    condition: String,
    humidity: String,
    wind_kph: String,
    wind_mph: String,
    wind_direction: String,
    uv_index: String,
    visibility_km: String,
    pressure_mb: String,
}

// MyMemory `/get`.

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MyMemoryReply {
    response_data: MyMemoryData,
    /// Numeric on success, sometimes a string on failure.
    response_status: Value,
    response_details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: String,
    detected_language: Option<String>,
}

impl MyMemoryReply {
    fn status_code(&self) -> Option<i64> {
        match &self.response_status {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslationOutput<'a> {
    original_text: &'a str,
    translated_text: String,
    source_language: String,
    target_language: &'a str,
}

/// Keep the first `sentences` sentences of `extract`, split on `". "` and
/// terminated with a period. Zero keeps everything.
fn leading_sentences(extract: &str, sentences: usize) -> String {
    if sentences == 0 || extract.is_empty() {
        return extract.to_string();
    }
    let mut kept = extract
        .split(". ")
        .take(sentences)
        .collect::<Vec<_>>()
        .join(". ");
    if !kept.ends_with('.') {
        kept.push('.');
    }
    kept
}

/// Append path segments to an API root, percent-encoding each one.
fn api_url(root: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(root)?;
    url.path_segments_mut()
        .map_err(|()| Error::Config(format!("endpoint {root} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl WebToolkit {
    /// Look up the Wikipedia summary of `query`.
    ///
    /// The extract is cut to `sentences` sentences (0 keeps it whole). When
    /// no article matches, the response is `not_found` and, when Wikipedia
    /// offers any, carries up to five title suggestions.
    #[tracing::instrument(skip(self))]
    pub async fn search_wikipedia(&self, query: &str, sentences: usize) -> String {
        match self.wikipedia_summary(query, sentences).await {
            Ok(WikiOutcome::Found(output)) => Envelope::success(output).render(),
            Ok(WikiOutcome::Suggestions(suggestions)) => {
                let message = if suggestions.is_empty() {
                    "No Wikipedia article found for this query."
                } else {
                    "Article not found. Did you mean:"
                };
                Envelope::not_found(WikipediaMiss {
                    query,
                    message,
                    suggestions,
                })
                .render()
            },
            Err(err) => Failure::new("Wikipedia search failed", &err)
                .subject("query", query)
                .render(),
        }
    }

    async fn wikipedia_summary(&self, query: &str, sentences: usize) -> Result<WikiOutcome> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }
        let title = query.trim().replace(' ', "_");
        let url = api_url(
            &self.config.endpoints.wikipedia_rest,
            &["page", "summary", &title],
        )?;

        let summary: WikiSummary = match self
            .fetcher
            .get_json(url.as_str(), &[], RequestProfile::Api)
            .await
        {
            Ok(summary) => summary,
            Err(err) if err.is_not_found() => {
                return Ok(WikiOutcome::Suggestions(self.wikipedia_suggestions(query).await));
            },
            Err(err) => return Err(err),
        };

        Ok(WikiOutcome::Found(WikipediaOutput {
            title: summary.title,
            description: summary.description,
            extract: leading_sentences(&summary.extract, sentences),
            url: summary
                .content_urls
                .and_then(|u| u.desktop)
                .map(|d| d.page)
                .unwrap_or_default(),
            thumbnail: summary.thumbnail.map(|t| t.source).unwrap_or_default(),
        }))
    }

    /// Title suggestions for a query with no exact article. A failed
    /// suggestion lookup yields none.
    async fn wikipedia_suggestions(&self, query: &str) -> Vec<Suggestion> {
        let params = [
            ("action", "opensearch"),
            ("search", query),
            ("limit", "5"),
            ("format", "json"),
        ];
        match self
            .fetcher
            .get_json::<OpenSearch>(&self.config.endpoints.wikipedia_action, &params, RequestProfile::Api)
            .await
        {
            Ok((_, titles, _, urls)) => titles
                .into_iter()
                .zip(urls)
                .map(|(title, url)| Suggestion { title, url })
                .collect(),
            Err(err) => {
                debug!("opensearch suggestions unavailable: {err}");
                Vec::new()
            },
        }
    }

    /// Current conditions for a place name, airport code or coordinates.
    #[tracing::instrument(skip(self))]
    pub async fn get_weather(&self, location: &str) -> String {
        match self.weather_report(location).await {
            Ok(output) => Envelope::success(output).render(),
            Err(err) => Failure::new("Weather lookup failed", &err)
                .subject("location", location)
                .render(),
        }
    }

    async fn weather_report(&self, location: &str) -> Result<WeatherOutput> {
        if location.trim().is_empty() {
            return Err(Error::InvalidInput("location must not be empty".into()));
        }
        let url = api_url(&self.config.endpoints.weather, &[location.trim()])?;
        let report: WttrReport = self
            .fetcher
            .get_json(url.as_str(), &[("format", "j1")], RequestProfile::Api)
            .await?;

        let current = report
            .current_condition
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no current conditions for {location}")))?;
        let area = report.nearest_area.into_iter().next().unwrap_or_default();

        Ok(WeatherOutput {
            location: WeatherLocation {
                name: first_value(&area.area_name).unwrap_or_else(|| location.to_string()),
                region: first_value(&area.region).unwrap_or_default(),
                country: first_value(&area.country).unwrap_or_default(),
            },
            current: CurrentWeather {
                condition: first_value(&current.weather_desc).unwrap_or_default(),
                humidity: format!("{}%", current.humidity),
                temperature_c: current.temp_c,
                temperature_f: current.temp_f,
                feels_like_c: current.feels_like_c,
                feels_like_f: current.feels_like_f,
                wind_kph: current.windspeed_kmph,
                wind_mph: current.windspeed_miles,
                wind_direction: current.winddir_16_point,
                uv_index: current.uv_index,
                visibility_km: current.visibility,
                pressure_mb: current.pressure,
            },
        })
    }

    /// Translate `text` into `target_lang`.
    ///
    /// With `source_lang = "auto"` the source language is detected first,
    /// falling back to English.
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn translate_text(&self, text: &str, target_lang: &str, source_lang: &str) -> String {
        match self.translation(text, target_lang, source_lang).await {
            Ok(json) => json,
            Err(err) => Failure::new("Translation failed", &err)
                .subject("text", text)
                .render(),
        }
    }

    async fn translation(&self, text: &str, target_lang: &str, source_lang: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text must not be empty".into()));
        }
        let endpoint = api_url(&self.config.endpoints.translate, &["get"])?;

        let source = if source_lang == "auto" {
            let probe = take_chars(text, self.config.limits.detect_probe_chars);
            let reply: MyMemoryReply = self
                .fetcher
                .get_json(
                    endpoint.as_str(),
                    &[("q", probe), ("langpair", "en|en")],
                    RequestProfile::Api,
                )
                .await?;
            let detected = reply
                .response_data
                .detected_language
                .filter(|lang| !lang.is_empty())
                .unwrap_or_else(|| "en".to_string());
            debug!(detected = %detected, "source language detected");
            detected
        } else {
            source_lang.to_string()
        };

        let langpair = format!("{source}|{target_lang}");
        let reply: MyMemoryReply = self
            .fetcher
            .get_json(
                endpoint.as_str(),
                &[("q", text), ("langpair", langpair.as_str())],
                RequestProfile::Api,
            )
            .await?;

        if reply.status_code() != Some(200) {
            return Err(Error::Backend(
                reply
                    .response_details
                    .unwrap_or_else(|| "translation service rejected the request".to_string()),
            ));
        }

        Ok(Envelope::success(TranslationOutput {
            original_text: text,
            translated_text: reply.response_data.translated_text,
            source_language: source,
            target_language: target_lang,
        })
        .render())
    }
}
