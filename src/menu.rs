use std::io::{self, Write};

pub fn show_menu() {
    println!("\n===========================================");
    println!("Solar Tracker Control (simulated plant)");
    println!("===========================================");
    println!("Select an option:");
    println!("1. Track the sun");
    println!("2. Protect (park)");
    println!("3. Simulate a tracking day");
    println!("4. Exit");
    println!("===========================================");
    print!("Choice (1-4): ");
    let _ = io::stdout().flush();
}

pub fn get_user_choice() -> io::Result<Option<u32>> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().parse::<u32>().ok())
}

pub fn wait_for_enter() {
    println!("\nPress Enter to return to menu...");
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
}
