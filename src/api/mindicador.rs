//! [mindicador.cl](https://mindicador.cl/) dollar-index client.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Deserializer, de};

use crate::{prelude::*, quantity::Pesos};

const BASE_URL: &str = "https://mindicador.cl/api/dolar";
const USER_AGENT: &str = "Mozilla/5.0 (condor)";

/// Today's exchange rate as reported by the API.
#[derive(Copy, Clone, Debug)]
pub struct Observation {
    pub value: Pesos,

    /// Date the API attributes the rate to, which is not necessarily today.
    pub date: NaiveDate,
}

pub struct Api(Client);

impl Api {
    pub fn try_new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self(client))
    }

    /// Fetch the most recent observation from the dollar series.
    #[instrument(skip_all)]
    pub async fn get_latest(&self) -> Result<Observation> {
        let response = self
            .0
            .get(BASE_URL)
            .send()
            .await
            .context("failed to call the mindicador API")?
            .error_for_status()
            .context("the mindicador API request failed")?
            .json::<IndicatorResponse>()
            .await
            .context("failed to deserialize the mindicador response")?;
        let observation = response.into_latest()?;
        info!(value = %observation.value, date = %observation.date, "fetched");
        Ok(observation)
    }
}

#[derive(Deserialize)]
struct IndicatorResponse {
    #[serde(rename = "serie")]
    series: Vec<SeriesPoint>,
}

impl IndicatorResponse {
    fn into_latest(self) -> Result<Observation> {
        let point = self.series.into_iter().next().context("the dollar series is empty")?;
        Ok(Observation { value: point.value, date: point.date })
    }
}

#[derive(Deserialize)]
struct SeriesPoint {
    #[serde(rename = "valor")]
    value: Pesos,

    /// The API reports RFC 3339 timestamps, only the calendar date matters.
    #[serde(rename = "fecha", deserialize_with = "SeriesPoint::deserialize_fecha")]
    date: NaiveDate,
}

impl SeriesPoint {
    fn deserialize_fecha<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let value = String::deserialize(deserializer)?;
        let date_part = value.get(..10).unwrap_or(&value);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&value), &"a `YYYY-MM-DD`-prefixed date")
        })
    }
}
