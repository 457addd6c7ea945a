use crate::domain::decision::Recommendation;
use crate::predict::{Condition, PredictionParams};
use serde::Serialize;

/// One-click demo vehicle shown under the analysis form.
#[derive(Debug, Clone, Serialize)]
pub struct DemoVehicle {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// Signal the demo is expected to produce.
    pub tag: Recommendation,
    pub make: &'static str,
    pub model: &'static str,
    pub year: i32,
    pub mileage: u32,
    pub condition: Condition,
    pub region: &'static str,
}

impl DemoVehicle {
    pub fn params(&self) -> PredictionParams {
        PredictionParams {
            make: self.make.to_string(),
            model: self.model.to_string(),
            year: self.year,
            mileage: self.mileage,
            condition: self.condition,
            region: self.region.to_string(),
        }
    }
}

static DEMOS: [DemoVehicle; 5] = [
    DemoVehicle {
        key: "toyota-camry",
        label: "Toyota Camry",
        description: "Stable demand, balanced market conditions",
        tag: Recommendation::Monitor,
        make: "toyota",
        model: "camry",
        year: 2020,
        mileage: 42_000,
        condition: Condition::Good,
        region: "texas",
    },
    DemoVehicle {
        key: "honda-civic",
        label: "Honda Civic",
        description: "Below market median, strong value pick",
        tag: Recommendation::BuyNow,
        make: "honda",
        model: "civic",
        year: 2020,
        mileage: 55_000,
        condition: Condition::Good,
        region: "florida",
    },
    DemoVehicle {
        key: "ford-f-150",
        label: "Ford F-150",
        description: "Truck prices softening nationally",
        tag: Recommendation::Wait,
        make: "ford",
        model: "f-150",
        year: 2019,
        mileage: 68_000,
        condition: Condition::Good,
        region: "texas",
    },
    DemoVehicle {
        key: "jeep-wrangler",
        label: "Jeep Wrangler",
        description: "High off-road demand, constrained inventory",
        tag: Recommendation::BuyNow,
        make: "jeep",
        model: "wrangler",
        year: 2020,
        mileage: 45_000,
        condition: Condition::Good,
        region: "ohio",
    },
    DemoVehicle {
        key: "bmw-3-series",
        label: "BMW 3 Series",
        description: "Luxury market softening post rate hike",
        tag: Recommendation::Wait,
        make: "bmw",
        model: "3 series",
        year: 2020,
        mileage: 48_000,
        condition: Condition::Good,
        region: "new york",
    },
];

pub fn demos() -> &'static [DemoVehicle] {
    &DEMOS
}

pub fn find_demo(key: &str) -> Option<&'static DemoVehicle> {
    let key = key.trim().to_ascii_lowercase();
    DEMOS.iter().find(|d| d.key == key)
}
