use paramline::Parameter;

#[derive(Parameter, Clone, Copy)]
#[param(
    id = FanDutyCycle,
    name = "FanDutyCycle",
    label = "FanDuty",
    default = 50.0,
    min = 0.0,
    max = 100.0
)]
struct Wide {
    percent: f64,
}

fn main() {
    let value = Wide { percent: 1.0 };
    let _ = value.percent;
}
