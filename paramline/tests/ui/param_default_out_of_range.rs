use paramline::Parameter;

#[derive(Parameter, Clone, Copy)]
#[param(
    id = FanDutyCycle,
    name = "FanDutyCycle",
    label = "FanDuty",
    default = 120.0,
    min = 0.0,
    max = 100.0
)]
struct Overshoot {
    percent: f32,
}

fn main() {
    let value = Overshoot { percent: 1.0 };
    let _ = value.percent;
}
