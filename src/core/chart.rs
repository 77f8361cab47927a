use serde::Serialize;

use super::types::{AssetClass, MarketSimulation, Portfolio};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<&'static str>,
    pub border_width: u32,
    pub fill: bool,
}

const BAR_BORDER_WIDTH: u32 = 1;
const LINE_BORDER_WIDTH: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

fn line_color(class: AssetClass) -> &'static str {
    match class {
        AssetClass::Stocks => "rgba(255, 206, 86, 1)",
        AssetClass::Bonds => "rgba(54, 162, 235, 1)",
        AssetClass::RealEstate => "rgba(75, 192, 192, 1)",
        AssetClass::Commodities => "rgba(153, 102, 255, 1)",
    }
}

/// Bars of current against previous value per asset class.
pub fn portfolio_chart(portfolio: &Portfolio) -> ChartData {
    let (current, previous): (Vec<f64>, Vec<f64>) = portfolio
        .holdings()
        .map(|(_, holding)| (holding.current_value(), holding.previous_value()))
        .unzip();

    ChartData {
        labels: AssetClass::ALL
            .iter()
            .map(|class| class.label().to_string())
            .collect(),
        datasets: vec![
            Dataset {
                label: "Current Value".to_string(),
                data: current,
                border_color: "rgb(75, 192, 192)",
                background_color: Some("rgba(75, 192, 192, 0.2)"),
                border_width: BAR_BORDER_WIDTH,
                fill: false,
            },
            Dataset {
                label: "Previous Value".to_string(),
                data: previous,
                border_color: "rgb(255, 99, 132)",
                background_color: Some("rgba(255, 99, 132, 0.2)"),
                border_width: BAR_BORDER_WIDTH,
                fill: false,
            },
        ],
    }
}

/// One line per simulated path, sharing the simulation's date labels.
pub fn market_datasets(simulation: &MarketSimulation) -> Vec<Dataset> {
    simulation
        .paths
        .iter()
        .map(|path| Dataset {
            label: format!("{} Value", path.asset_class.label()),
            data: path.values.clone(),
            border_color: line_color(path.asset_class),
            background_color: None,
            border_width: LINE_BORDER_WIDTH,
            fill: false,
        })
        .collect()
}
