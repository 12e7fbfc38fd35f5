use paramline::Parameter;

#[derive(Parameter, Clone, Copy)]
#[param(
    id = FanDutyCycle,
    name = "FanDutyCycle",
    label = "FanDuty",
    default = 50.0,
    min = 100.0,
    max = 0.0
)]
struct Inverted {
    percent: f32,
}

fn main() {
    let value = Inverted { percent: 1.0 };
    let _ = value.percent;
}
