#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub header: &'static str,
    pub metric: &'static str,
}

pub const TIME_S: Tag = Tag {
    key: "timestamp_s",
    label: "Time",
    unit: "s",
    header: "Time (s)",
    metric: "gse_sample_timestamp_seconds",
};

pub const TANK_PRESSURE_PSI: Tag = Tag {
    key: "tank_pressure_psi",
    label: "Tank Pressure",
    unit: "psi",
    header: "Tank Pressure (psi)",
    metric: "gse_tank_pressure_psi",
};

pub const ACCUMULATOR_PRESSURE_PSI: Tag = Tag {
    key: "accumulator_pressure_psi",
    label: "Accumulator Pressure",
    unit: "psi",
    header: "Accumulator Pressure (psi)",
    metric: "gse_accumulator_pressure_psi",
};

pub const INLET_TEMPERATURE_C: Tag = Tag {
    key: "inlet_temperature_c",
    label: "Inlet Temperature",
    unit: "°C",
    header: "Inlet Temperature (°C)",
    metric: "gse_inlet_temperature_celsius",
};

pub const MASS_FLOW_GPS: Tag = Tag {
    key: "mass_flow_gps",
    label: "Mass Flow Rate",
    unit: "g/s",
    header: "Mass Flow Rate (g/s)",
    metric: "gse_mass_flow_grams_per_second",
};

pub const THRUST_MN: Tag = Tag {
    key: "thrust_mn",
    label: "Thrust",
    unit: "mN",
    header: "Thrust (mN)",
    metric: "gse_thrust_millinewtons",
};

/// Column order of a voltage-mode series (no mass flow channel).
pub const VOLTAGE_COLUMNS: &[Tag] = &[
    TIME_S,
    TANK_PRESSURE_PSI,
    ACCUMULATOR_PRESSURE_PSI,
    INLET_TEMPERATURE_C,
    THRUST_MN,
];

/// Column order of a physical-mode series.
pub const PHYSICAL_COLUMNS: &[Tag] = &[
    TIME_S,
    TANK_PRESSURE_PSI,
    ACCUMULATOR_PRESSURE_PSI,
    INLET_TEMPERATURE_C,
    MASS_FLOW_GPS,
    THRUST_MN,
];
