/// A well-formed five-question reply; correct letters are B, C, A, D, B.
pub const FIVE_MCQS: &str = "\
1. Question: What is the SI unit of force? A) Joule B) Newton C) Watt D) Pascal Answer: B Explanation: Force is measured in newtons. ---
2. Question: Which quantity is a vector? A) Speed B) Mass C) Velocity D) Energy Answer: C Explanation: Velocity has direction. ---
3. Question: Acceleration due to gravity on Earth is about? A) 9.8 m/s^2 B) 1 m/s^2 C) 98 m/s^2 D) 0.98 m/s^2 Answer: A Explanation: g is roughly 9.8 m/s^2. ---
4. Question: Momentum equals? A) m/v B) mv^2 C) ma D) mv Answer: D Explanation: p = mv. ---
5. Question: Work done is zero when force is? A) Parallel B) Perpendicular to motion C) Large D) Small Answer: B Explanation: W = Fd cos 90 = 0.";
