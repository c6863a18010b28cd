use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    memory_budget: usize,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tmp_suffix: String,
        memory_budget: usize,
    ) -> Config {
        Config {
            tmp,
            tmp_prefix,
            tmp_suffix,
            memory_budget,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tmp_suffix(&self) -> &String {
        &self.tmp_suffix
    }

    pub(crate) fn memory_budget(&self) -> usize {
        self.memory_budget
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests(tmp: &std::path::Path, memory_budget: usize) -> Config {
        Config::new(tmp.to_path_buf(), "tb-sort-test-".to_string(), ".run".to_string(), memory_budget)
    }
}
