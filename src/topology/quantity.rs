use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Unit {
    #[serde(rename = "cores")]
    Cores,
    #[serde(rename = "GB")]
    Gb,
    #[default]
    #[serde(rename = "")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity {
        value: 0.0,
        unit: Unit::None,
    };

    fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

// (suffix, divisor, unit)
const SUFFIXES: [(&str, f64, Unit); 5] = [
    ("m", 1000.0, Unit::Cores),
    ("Ki", 1024.0 * 1024.0, Unit::Gb),
    ("Mi", 1024.0, Unit::Gb),
    ("Gi", 1.0, Unit::Gb),
    ("Ti", 1.0 / 1024.0, Unit::Gb),
];

/// Parse a quantity string. Malformed input yields [`Quantity::ZERO`].
pub fn parse(quantity: &str) -> Quantity {
    let quantity = quantity.trim();
    if quantity.is_empty() || quantity == "0" {
        return Quantity::ZERO;
    }

    for (suffix, divisor, unit) in SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return match parse_number(number) {
                Some(v) => Quantity::new(v / divisor, unit),
                None => Quantity::ZERO,
            };
        }
    }

    match parse_number(quantity) {
        Some(v) => Quantity::new(v, Unit::Cores),
        None => Quantity::ZERO,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
