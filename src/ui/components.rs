/// Reusable UI components

use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ProgressBarProps {
    pub percentage: f64, // 0-100
    #[prop_or_default]
    pub label: Option<String>,
}

#[function_component(ProgressBar)]
pub fn progress_bar(props: &ProgressBarProps) -> Html {
    let percentage = props.percentage.clamp(0.0, 100.0);

    html! {
        <div class="progress-wrapper">
            if let Some(label) = &props.label {
                <p class="progress-label">{label.clone()}</p>
            }
            <div class="progress-container">
                <div class="progress-fill" style={format!("width: {:.3}%;", percentage)}></div>
            </div>
            <p class="progress-value">{format_percentage(percentage)}</p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct TimeUnitProps {
    pub value: u32,
    pub label: AttrValue,
}

#[function_component(TimeUnit)]
pub fn time_unit(props: &TimeUnitProps) -> Html {
    html! {
        <div class="time-unit">
            <span class="time-unit-value">{format!("{:02}", props.value)}</span>
            <span class="time-unit-label">{props.label.clone()}</span>
        </div>
    }
}

/// Percentage with three decimals, e.g. "99.998%"
pub fn format_percentage(percentage: f64) -> String {
    format!("{:.3}%", percentage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.0), "0.000%");
        assert_eq!(format_percentage(50.0), "50.000%");
        assert_eq!(format_percentage(99.99884), "99.999%");
    }
}
