mod flow_monitor;
mod sim_time;
mod simulator;
mod tcp;
