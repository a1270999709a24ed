#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceChange {
    New,
    HalvedOrBelow { previous: f64 },
    /// `percent_change` is absent when the previous price was zero.
    Unchanged {
        previous: f64,
        percent_change: Option<f64>,
    },
}

pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    (previous > 0.0).then(|| (current - previous) / previous * 100.0)
}

impl PriceChange {
    pub fn classify(current: f64, previous: Option<f64>) -> Self {
        match previous {
            None => PriceChange::New,
            Some(previous) if current <= previous / 2.0 => PriceChange::HalvedOrBelow { previous },
            Some(previous) => PriceChange::Unchanged {
                previous,
                percent_change: percent_change(current, previous),
            },
        }
    }

    pub fn report(&self, name: &str, current: f64) -> String {
        match self {
            PriceChange::New => format!("🆕 New product: {name} - price: {current}"),
            PriceChange::HalvedOrBelow { previous } => {
                format!("✅ Price HALVED! {name}\nWas: {previous}, now: {current}")
            }
            PriceChange::Unchanged {
                previous,
                percent_change: Some(percent),
            } => format!(
                "📊 No significant change: {name}\nWas: {previous}, now: {current} ({percent:+.1}%)"
            ),
            PriceChange::Unchanged {
                previous,
                percent_change: None,
            } => format!("📊 No significant change: {name}\nWas: {previous}, now: {current}"),
        }
    }
}
