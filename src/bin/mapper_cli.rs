#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("mapper_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use skeleton_mapper::hierarchy::Hierarchy;
    use skeleton_mapper::mapper::Mapper;
    use skeleton_mapper::operators::registry;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::PathBuf;

    const USAGE: &str = r#"mapper_cli (skeleton-mapper)

USAGE:
  mapper_cli classes
  mapper_cli check <mapper.xml> [--skeleton <hierarchy.xml>]
  mapper_cli roundtrip <mapper.xml> [--skeleton <hierarchy.xml>] [--out <path>] [--overwrite]

COMMANDS:
  classes      List the registered operator classes with their slot counts
  check        Load a mapper file and print the derived location hierarchy
  roundtrip    Load a mapper file and write it back (stdout unless --out)

OPTIONS:
  --skeleton <path>  Hierarchy XML to map onto (default: nodes from the mapper file)
  --out <path>       Write the re-serialized mapper to this file
  --overwrite        Overwrite an existing --out file
  -h, --help         Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "classes" => {
                print_classes();
                Ok(())
            }
            "check" => cmd_check(&mut args),
            "roundtrip" => cmd_roundtrip(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_classes() {
        let registry = registry();
        for index in 0..registry.count() {
            if let Some(descriptor) = registry.descriptor(index) {
                println!(
                    "{:<24} position={} orientation={}",
                    descriptor.name, descriptor.position_slots, descriptor.orientation_slots
                );
            }
        }
    }

    struct Options {
        mapper: PathBuf,
        skeleton: Option<PathBuf>,
        out: Option<PathBuf>,
        overwrite: bool,
    }

    fn parse_options(args: &mut Args, allow_out: bool) -> Result<Option<Options>, String> {
        let mapper = PathBuf::from(args.next().ok_or("missing mapper file")?);
        let mut options = Options {
            mapper,
            skeleton: None,
            out: None,
            overwrite: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--skeleton" => options.skeleton = Some(PathBuf::from(args.value("--skeleton")?)),
                "--out" if allow_out => options.out = Some(PathBuf::from(args.value("--out")?)),
                "--overwrite" if allow_out => options.overwrite = true,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(None);
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }
        Ok(Some(options))
    }

    fn load_mapper(options: &Options) -> Result<Mapper, String> {
        let mut mapper = match &options.skeleton {
            Some(path) => {
                let xml = fs::read_to_string(path)
                    .map_err(|e| format!("read {}: {e}", path.display()))?;
                let hierarchy = Hierarchy::from_xml(&xml)
                    .map_err(|e| format!("parse {}: {e}", path.display()))?;
                Mapper::from_hierarchy(hierarchy)
            }
            None => Mapper::new(),
        };

        mapper
            .load(&options.mapper)
            .map_err(|e| format!("load {}: {e}", options.mapper.display()))?;
        Ok(mapper)
    }

    fn cmd_check(args: &mut Args) -> Result<(), String> {
        let Some(options) = parse_options(args, false)? else {
            return Ok(());
        };
        let mapper = load_mapper(&options)?;

        let mut locations = Hierarchy::new();
        if !mapper.create_locations_hierarchy(&mut locations) {
            println!("no mapped nodes");
            return Ok(());
        }

        let mut report = String::new();
        for index in locations.roots().collect::<Vec<_>>() {
            describe(&locations, index, 0, &mut report);
        }
        print!("{report}");
        println!(
            "{} of {} nodes mapped, {} locations",
            locations.node_count(),
            mapper.node_count(),
            mapper.location_count()
        );
        Ok(())
    }

    fn describe(hierarchy: &Hierarchy, index: usize, depth: usize, out: &mut String) {
        if let Some(node) = hierarchy.node(index) {
            let _ = writeln!(out, "{:indent$}{}", "", node.name, indent = depth * 2);
        }
        for child in hierarchy.children_indices(index) {
            describe(hierarchy, child, depth + 1, out);
        }
    }

    fn cmd_roundtrip(args: &mut Args) -> Result<(), String> {
        let Some(options) = parse_options(args, true)? else {
            return Ok(());
        };
        let mapper = load_mapper(&options)?;

        match &options.out {
            Some(path) => {
                if path.exists() && !options.overwrite {
                    return Err(format!(
                        "{} exists (use --overwrite to replace it)",
                        path.display()
                    ));
                }
                mapper
                    .save(path)
                    .map_err(|e| format!("write {}: {e}", path.display()))?;
                println!("wrote {}", path.display());
            }
            None => {
                let xml = mapper.to_xml().map_err(|e| format!("serialize: {e}"))?;
                println!("{xml}");
            }
        }
        Ok(())
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
