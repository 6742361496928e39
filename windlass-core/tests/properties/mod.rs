mod exec_protocol_tests;
mod gate_tests;
mod telemetry_tests;
