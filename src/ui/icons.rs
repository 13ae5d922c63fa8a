pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const FOLDER: &str = "📂";
    pub const DATABASE: &str = "🗄️";
    pub const GEAR: &str = "⚙️";
}
