use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Error;
use simple_logger::SimpleLogger;
use tb_sort::aggregate::{Accumulator, Aggregate};
use tb_sort::external_sort::ExternalSort;
use tb_sort::field::Field;
use tb_sort::field_type::FieldType;
use tb_sort::order::Order;
use tb_sort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const CITIES: [&str; 6] = ["Oslo", "Lima", "Paris", "Rome", "Quito", "Kyiv"];

fn create_table(path: &Path, rows: usize) -> Result<(), Error> {
    let mut content = String::from("id,city,amount\n");
    for i in 0..rows {
        content.push_str(&format!("order{},{},{}\n", i, CITIES[i % CITIES.len()], (i * 37) % 500));
    }
    fs::write(path, content)?;
    Ok(())
}

fn shuffle(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut table = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    table.with_header(true);
    table.with_fields(vec![Field::new(0, FieldType::String).with_random(true)]);
    table.sort()?;
    Ok(())
}

fn sort_by_id(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // order2 before order10
    let mut table = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    table.with_header(true);
    table.with_field_separator(',');
    table.add_field(Field::named("id", FieldType::Natural));
    table.sort()?;
    Ok(())
}

fn sort_by_city_amount_desc(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut table = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    table.with_header(true);
    table.with_field_separator(',');
    table.with_order(Order::Desc);
    table.with_memory_budget(4096);
    table.add_field(Field::named("city", FieldType::String));
    table.add_field(Field::named("amount", FieldType::Integer));
    table.sort()?;
    Ok(())
}

fn sum_by_city(input_path: &Path) -> Result<Vec<(String, String)>, Error> {
    let content = fs::read_to_string(input_path)?;
    let mut sort = ExternalSort::new();
    sort.with_memory_budget(1024);
    sort.with_reduce(Accumulator::merge);
    let rows = content.lines().skip(1).map(|line| {
        let parts: Vec<&str> = line.split(',').collect();
        let city = parts.get(1).copied().unwrap_or_default();
        let amount = parts.get(2).copied().unwrap_or_default();
        Ok::<_, Error>((city.to_string(), Aggregate::Sum.start(amount)?))
    });
    let mut sorted = sort.try_sort(rows)?;
    let mut result = Vec::new();
    for entry in sorted.entries()? {
        let (city, sum) = entry?;
        result.push((city, sum.finish()));
    }
    Ok(result)
}

// cargo run -r --example sort_table
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;

    let table_path = PathBuf::from("./target/table-1000.csv");
    let random_path = PathBuf::from("./target/random-1000.csv");
    let by_id_path = PathBuf::from("./target/by-id-1000.csv");
    let by_city_path = PathBuf::from("./target/by-city-1000.csv");

    create_table(&table_path, 1000)?;
    shuffle(&table_path, &random_path)?;
    sort_by_id(&random_path, &by_id_path)?;
    sort_by_city_amount_desc(&random_path, &by_city_path)?;
    for (city, sum) in sum_by_city(&random_path)? {
        log::info!("{}: {}", city, sum);
    }

    Ok(())
}
