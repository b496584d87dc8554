use rover_kinematics::*;

fn main() {
    let bounds = MapBounds::new(0.0, 100.0);
    let start = Position::new(3.0, 2.0);
    let twist = Twist::new(1.0, 0.5); // forward with a slight drift
    let num_steps = 12;

    match bounds.and_then(|b| PlanarDrive::new(0.5, b)) {
        Ok(drive) => {
            println!("Initializing drive...");
            println!("  Model:      {}", drive);
            println!("  Start:      {}", start);
            println!("  Twist:      {}", twist);
            println!("  Num Steps:  {}", num_steps);
            println!("\nStepping...");

            let mut position = start;
            for i in 0..num_steps {
                position = drive.step(position, twist);
                println!("Step {:>2}: Position: {}", i + 1, position);
            }

            println!("\nDone.");
            println!("Final Position: {}", position);
        }
        Err(e) => {
            eprintln!("Failed to initialize drive: {:?}", e);
        }
    }
}
