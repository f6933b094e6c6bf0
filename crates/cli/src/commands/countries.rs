use komodo::CountryCatalog;

pub fn execute() {
	for (index, name) in CountryCatalog::default().iter() {
		println!("{index:>3}  {name}");
	}
}
