//! Plain-text output for the terminal.

use half_ryd_core::{StoredArrival, SyncReport};
use half_ryd_transit::{ArrivalDocument, BusRoute, BusService, BusStop, NextBusSnapshot};

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn next_bus(label: &str, bus: Option<&NextBusSnapshot>) {
    let Some(bus) = bus else {
        return;
    };
    let eta = bus
        .estimated_arrival
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_owned());
    println!(
        "  {label}: {eta}, {}, wheelchair accessible: {}",
        bus.load,
        yes_no(bus.wheelchair_accessible)
    );
}

pub fn arrival(document: &ArrivalDocument) {
    println!("Service {} at {} ({})", document.service_no, document.bus_stop_code, document.date);
    println!("  {}", document.operation_status);
    println!("  {}", document.arrival_status);
    if let Some(eta) = &document.estimated_arrival {
        println!("  Estimated arrival: {eta}");
    }
    println!("  Load: {}", document.load);
    println!("  Wheelchair accessible: {}", yes_no(document.wheelchair_accessible));
    if let Some(vehicle) = document.vehicle_type {
        println!("  Vehicle: {vehicle}");
    }
    next_bus("Next bus 2", document.next_bus2.as_ref());
    next_bus("Next bus 3", document.next_bus3.as_ref());
}

pub fn history(entries: &[StoredArrival]) {
    if entries.is_empty() {
        println!("No bus arrival documents found.");
        return;
    }
    for entry in entries {
        print!("#{} ", entry.id);
        arrival(&entry.document);
        println!();
    }
}

pub fn stop(stop: &BusStop) {
    println!("{} {}", stop.bus_stop_code, stop.description);
    println!("  {}", stop.road_name);
    println!("  {:.6}, {:.6}", stop.latitude, stop.longitude);
}

pub fn service(service: &BusService) {
    println!("Service {} ({}, {})", service.service_no, service.operator, service.category);
    println!("  Direction: {}", service.direction);
    let terminal = |code: Option<&half_ryd_transit::BusStopCode>| {
        code.map_or_else(|| "-".to_owned(), |c| c.to_string())
    };
    println!(
        "  From {} to {}",
        terminal(service.origin_code.as_ref()),
        terminal(service.destination_code.as_ref())
    );
    println!(
        "  Frequency (min): AM peak {}, AM off-peak {}, PM peak {}, PM off-peak {}",
        service.am_peak_freq, service.am_offpeak_freq, service.pm_peak_freq, service.pm_offpeak_freq
    );
    if !service.loop_desc.is_empty() {
        println!("  Loops at {}", service.loop_desc);
    }
}

pub fn routes(routes: &[BusRoute]) {
    println!("{:>3} {:>4} {:<6} {:>7}  {:<9} {:<9} {:<9}", "Dir", "Seq", "Stop", "Km", "Weekday", "Saturday", "Sunday");
    for route in routes {
        let distance = route
            .distance
            .map_or_else(|| "-".to_owned(), |d| format!("{d:.1}"));
        println!(
            "{:>3} {:>4} {:<6} {:>7}  {:<9} {:<9} {:<9}",
            route.direction,
            route.stop_sequence,
            route.bus_stop_code,
            distance,
            format!("{}-{}", route.wd_first_bus, route.wd_last_bus),
            format!("{}-{}", route.sat_first_bus, route.sat_last_bus),
            format!("{}-{}", route.sun_first_bus, route.sun_last_bus),
        );
    }
}

pub fn codes<T: std::fmt::Display>(heading: &str, codes: &[T]) {
    if codes.is_empty() {
        println!("No {heading} yet.");
        return;
    }
    println!("{heading}:");
    for code in codes {
        println!("  {code}");
    }
}

pub fn sync_reports(reports: &[SyncReport]) {
    for report in reports {
        println!("{report}");
    }
}
