use serde::{Deserialize, Serialize};

/// Derived view of a stream's statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub tx: u64,
    pub rx: u64,
    pub loss_pct: f64,
    pub bytes_tx: u64,
    pub mb_tx: f64,
    /// Median latency, `None` without samples
    pub lat_p50: Option<f64>,
    /// 95th percentile latency, `None` below five samples
    pub lat_p95: Option<f64>,
    pub lat_mean: Option<f64>,
    /// Receive frame rate, `None` until receives span a positive interval
    pub fps: Option<f64>,
}

impl Summary {
    /// Field names in export order
    pub const FIELDS: [&'static str; 9] = [
        "tx", "rx", "loss_pct", "bytes_tx", "mb_tx", "lat_p50", "lat_p95", "lat_mean", "fps",
    ];

    /// Name/value pairs in [`Summary::FIELDS`] order; absent values are `None`
    pub fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        let values = [
            Some(self.tx.to_string()),
            Some(self.rx.to_string()),
            Some(self.loss_pct.to_string()),
            Some(self.bytes_tx.to_string()),
            Some(self.mb_tx.to_string()),
            self.lat_p50.map(|v| v.to_string()),
            self.lat_p95.map(|v| v.to_string()),
            self.lat_mean.map(|v| v.to_string()),
            self.fps.map(|v| v.to_string()),
        ];
        Self::FIELDS.into_iter().zip(values).collect()
    }

    /// Value of one field by name
    pub fn get(&self, field: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, value)| value)
    }
}

/// Round to three decimals, as reported in summaries
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
