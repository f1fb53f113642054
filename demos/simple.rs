use chain_commands::{Arguments, CommandModule, CommandSet, ErrorReport, ParserRegistry};

#[derive(Default)]
struct Shell {
    x: i64,
    z: i64,
    greeted: Vec<String>,
}

fn commands() -> CommandSet<Shell> {
    let registry = ParserRegistry::default();
    let mut commands = CommandSet::new();

    let tp = commands.register("teleport|tp");
    tp.on_error(|_shell: &mut Shell, report: &ErrorReport| {
        println!("{}: {}", report.input, report.error);
        Ok(())
    });
    tp.create_chain("@int(description='x coordinate') @int(description='z coordinate')", &registry)
        .expect("valid spec")
        .on_execute(|shell: &mut Shell, args: &Arguments| {
            shell.x = args.int(0).unwrap_or(0);
            shell.z = args.int(1).unwrap_or(0);
            println!("teleported to {} {}", shell.x, shell.z);
            Ok(())
        });

    commands
        .register("greet")
        .create_chain(
            "@string(placeholder=<name>) mike|milly(switch=by,required=false,default=mike) @int(required=false,min=1,max=5)",
            &registry,
        )
        .expect("valid spec")
        .on_execute(|shell: &mut Shell, args: &Arguments| {
            let name = args.string(0).unwrap_or_default();
            let times = args.int(2).unwrap_or(1);
            for _ in 0 .. times {
                println!("{} says hello to {}", args.string(1).unwrap_or_default(), name);
            }
            shell.greeted.push(name.to_owned());
            Ok(())
        });

    commands
}

fn main() {
    let commands = commands();
    let mut shell = Shell::default();

    for line in ["tp 10 -4", "tp 10 north", "greet bob 2", "greet -by milly alice", "fly"] {
        println!("> {}", line);
        if let Err(e) = commands.dispatch(line, &mut shell) {
            println!("error: {}", e);
        }
    }

    for line in ["t", "greet bob -by m", "greet bob "] {
        println!("suggestions for {:?}: {:?}", line, commands.get_suggestions(line, &shell));
    }

    println!("usage:");
    for usage in commands.usage() {
        println!("  {}", usage);
    }
}
